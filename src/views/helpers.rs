//! View helpers. Each helper is constructed by name from the registry and
//! exposes one variable, named after the helper, to the template.

use std::collections::HashMap;

use serde_json::{json, Map, Value};
use tera::Context;

use crate::errors::AppError;

pub const APP_NAME: &str = "Postboard";
const STYLESHEETS: &[&str] = &["/static/css/app.css"];

/// A helper requested by a controller, with its constructor parameters.
#[derive(Debug, Clone)]
pub struct HelperCall {
    pub name: String,
    pub params: Vec<Value>,
}

impl HelperCall {
    pub fn new(name: &str) -> Self {
        Self::with_params(name, Vec::new())
    }

    pub fn with_params(name: &str, params: Vec<Value>) -> Self {
        Self {
            name: name.to_string(),
            params,
        }
    }
}

pub trait Helper {
    fn name(&self) -> &'static str;

    fn value(&self) -> Value;

    fn inject(&self, ctx: &mut Context) {
        ctx.insert(self.name(), &self.value());
    }
}

type Constructor = fn(&[Value]) -> Result<Box<dyn Helper>, String>;

pub struct HelperRegistry {
    constructors: HashMap<&'static str, Constructor>,
}

impl HelperRegistry {
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: &'static str, constructor: Constructor) {
        self.constructors.insert(name, constructor);
    }

    pub fn build(&self, call: &HelperCall) -> Result<Box<dyn Helper>, AppError> {
        let constructor = self
            .constructors
            .get(call.name.as_str())
            .ok_or_else(|| AppError::Internal(format!("Le helper {} n'existe pas", call.name)))?;

        constructor(&call.params).map_err(|reason| {
            AppError::Internal(format!(
                "Les paramètres passés au helper {} sont invalides: {}",
                call.name, reason
            ))
        })
    }
}

impl Default for HelperRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("Form", FormHelper::from_params);
        registry.register("Html", HtmlHelper::from_params);
        registry
    }
}

// -------------------- Form --------------------

/// Values and validation errors of the record a form edits.
#[derive(Debug, Default)]
pub struct FormHelper {
    values: Map<String, Value>,
    errors: Map<String, Value>,
}

impl FormHelper {
    /// Params: `[record?, errors?]`. The record is an object or null, the
    /// errors an object of field name to list of messages.
    pub fn from_params(params: &[Value]) -> Result<Box<dyn Helper>, String> {
        if params.len() > 2 {
            return Err(format!("2 paramètres au plus, {} reçus", params.len()));
        }

        let values = match params.first() {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(record)) => record.clone(),
            Some(other) => return Err(format!("enregistrement attendu, reçu {}", other)),
        };

        let mut errors = match params.get(1) {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(errors)) => {
                let well_formed = errors.values().all(|messages| {
                    messages
                        .as_array()
                        .map_or(false, |list| list.iter().all(Value::is_string))
                });
                if !well_formed {
                    return Err("les erreurs doivent être des listes de messages".to_string());
                }
                errors.clone()
            }
            Some(other) => return Err(format!("erreurs attendues, reçu {}", other)),
        };

        // Every edited field gets an entry, so templates can loop over
        // `Form.errors.<field>` unconditionally.
        for field in values.keys() {
            errors
                .entry(field.clone())
                .or_insert_with(|| Value::Array(Vec::new()));
        }

        Ok(Box::new(FormHelper { values, errors }))
    }
}

impl Helper for FormHelper {
    fn name(&self) -> &'static str {
        "Form"
    }

    fn value(&self) -> Value {
        json!({
            "values": self.values,
            "errors": self.errors,
            "has_errors": self.errors.values().any(|messages| {
                messages.as_array().map_or(false, |list| !list.is_empty())
            }),
        })
    }
}

// -------------------- Html --------------------

/// Page-level data for the layout: application name, title, stylesheets.
#[derive(Debug)]
pub struct HtmlHelper {
    title: String,
}

impl HtmlHelper {
    pub fn from_params(params: &[Value]) -> Result<Box<dyn Helper>, String> {
        let title = match params {
            [] => APP_NAME.to_string(),
            [Value::String(title)] => format!("{} - {}", title, APP_NAME),
            _ => return Err("un titre (texte) au plus".to_string()),
        };
        Ok(Box::new(HtmlHelper { title }))
    }
}

impl Helper for HtmlHelper {
    fn name(&self) -> &'static str {
        "Html"
    }

    fn value(&self) -> Value {
        json!({
            "app_name": APP_NAME,
            "title": self.title,
            "stylesheets": STYLESHEETS,
        })
    }
}
