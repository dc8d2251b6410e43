use crate::ast::{Form, SEPARATOR};
use crate::error::SprigError;
use crate::namespace::{split_qualified, MacroFn, ModuleTable, MACRO_NS, QUALIFIER};
use crate::template::MAYBE;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpecialForm {
    Quote,
    Lambda,
}

pub enum Head {
    Special(SpecialForm),
    Macro { name: String, callable: MacroFn },
    Call,
}

impl std::fmt::Debug for Head {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Head::Special(form) => write!(f, "Special({:?})", form),
            Head::Macro { name, .. } => write!(f, "Macro({})", name),
            Head::Call => write!(f, "Call"),
        }
    }
}

pub struct Expander<'a> {
    modules: &'a ModuleTable,
    qualname: &'a str,
    max_steps: usize,
}

impl<'a> Expander<'a> {
    pub fn new(modules: &'a ModuleTable, qualname: &'a str, max_steps: usize) -> Self {
        Self {
            modules,
            qualname,
            max_steps,
        }
    }

    pub fn classify(&self, form: &Form) -> Result<Head, SprigError> {
        let Some(head) = form
            .as_tuple()
            .and_then(|items| items.first())
            .and_then(Form::as_str)
        else {
            return Ok(Head::Call);
        };
        match head {
            "quote" => return Ok(Head::Special(SpecialForm::Quote)),
            "lambda" => return Ok(Head::Special(SpecialForm::Lambda)),
            _ => {}
        }
        if let Some((module, path)) = split_qualified(head) {
            if let Some(name) = strip_segment(path, MACRO_NS) {
                let callable = self
                    .modules
                    .macro_fn(module, name)
                    .ok_or_else(|| SprigError::resolve(head))?;
                return Ok(Head::Macro {
                    name: head.to_string(),
                    callable: callable.clone(),
                });
            }
            if let Some(name) = strip_segment(path, MAYBE) {
                return Ok(match self.modules.macro_fn(module, name) {
                    Some(callable) => Head::Macro {
                        name: format!("{}{}{}.{}", module, QUALIFIER, MACRO_NS, name),
                        callable: callable.clone(),
                    },
                    None => Head::Call,
                });
            }
            return Ok(Head::Call);
        }
        Ok(match self.modules.macro_fn(self.qualname, head) {
            Some(callable) => Head::Macro {
                name: format!("{}{}{}.{}", self.qualname, QUALIFIER, MACRO_NS, head),
                callable: callable.clone(),
            },
            None => Head::Call,
        })
    }

    /// One expansion step. The flag reports whether a macro ran.
    pub fn macroexpand1(&self, form: Form) -> Result<(Form, bool), SprigError> {
        let Head::Macro { name, callable } = self.classify(&form)? else {
            return Ok((form, false));
        };
        let args = form.as_tuple().map(|items| &items[1..]).unwrap_or(&[]);
        log::debug!("expanding {} with {} argument(s)", name, args.len());
        let expanded = callable(args).map_err(|err| SprigError::macro_failure(name, err))?;
        Ok((expanded, true))
    }

    pub fn macroexpand(&self, form: Form) -> Result<Form, SprigError> {
        let mut form = form;
        let mut steps = 0;
        loop {
            if let Head::Macro { name, .. } = self.classify(&form)? {
                if steps >= self.max_steps {
                    return Err(SprigError::expansion_limit(name, self.max_steps));
                }
            }
            let (next, expanded) = self.macroexpand1(form)?;
            form = next;
            if !expanded {
                return Ok(form);
            }
            steps += 1;
        }
    }

    pub fn expand_all(&self, form: Form) -> Result<Form, SprigError> {
        let form = self.macroexpand(form)?;
        let special = match self.classify(&form)? {
            Head::Special(special) => Some(special),
            _ => None,
        };
        let Form::Tuple(items) = form else {
            return Ok(form);
        };
        match special {
            Some(SpecialForm::Quote) => Ok(Form::Tuple(items)),
            Some(SpecialForm::Lambda) => self.expand_lambda(items),
            None => items
                .into_iter()
                .map(|item| self.expand_all(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Form::Tuple),
        }
    }

    fn expand_lambda(&self, items: Vec<Form>) -> Result<Form, SprigError> {
        let mut items = items.into_iter();
        let mut out = Vec::new();
        out.extend(items.next());
        if let Some(params) = items.next() {
            out.push(self.expand_defaults(params)?);
        }
        for body in items {
            out.push(self.expand_all(body)?);
        }
        Ok(Form::Tuple(out))
    }

    fn expand_defaults(&self, params: Form) -> Result<Form, SprigError> {
        let Form::Tuple(items) = params else {
            return Ok(params);
        };
        let Some(sep) = items.iter().position(|item| item.is_str(SEPARATOR)) else {
            return Ok(Form::Tuple(items));
        };
        let mut out = Vec::with_capacity(items.len());
        for (idx, item) in items.into_iter().enumerate() {
            let is_default = idx > sep && (idx - sep) % 2 == 0 && !item.is_control();
            out.push(if is_default {
                self.expand_all(item)?
            } else {
                item
            });
        }
        Ok(Form::Tuple(out))
    }
}

fn strip_segment<'p>(path: &'p str, prefix: &str) -> Option<&'p str> {
    path.strip_prefix(prefix)?
        .strip_prefix('.')
        .filter(|rest| !rest.is_empty())
}
