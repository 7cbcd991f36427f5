//! Persona table: name → (template, history filter).
//!
//! Adding a persona is a config change; the pipeline never branches on a
//! persona name.

use std::collections::BTreeMap;

use parley_core::config::PersonaConfig;
use parley_core::{HistoryFilter, ParleyConfig, ParleyError};
use tracing::info;

use crate::prompt::PromptTemplate;

const SALES_TEMPLATE: &str = include_str!("../../../personas/sales.txt");
const WORKOUT_TEMPLATE: &str = include_str!("../../../personas/workout.txt");

/// A named instruction template plus the history it is fed.
#[derive(Debug, Clone)]
pub struct Persona {
    pub name: String,
    pub template: PromptTemplate,
    pub history_filter: HistoryFilter,
}

impl Persona {
    pub fn new(
        name: impl Into<String>,
        template: &str,
        history_filter: HistoryFilter,
    ) -> parley_core::Result<Self> {
        let name = name.into();
        let template = PromptTemplate::parse(template).map_err(|e| ParleyError::Persona {
            persona: name.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            name,
            template,
            history_filter,
        })
    }
}

/// Personas by name, plus the one served when none is named.
#[derive(Debug, Clone)]
pub struct PersonaTable {
    personas: BTreeMap<String, Persona>,
    default_name: String,
}

impl PersonaTable {
    /// Build a table from explicit personas. Fails if `default_name` is not
    /// among them.
    pub fn new(
        personas: impl IntoIterator<Item = Persona>,
        default_name: impl Into<String>,
    ) -> parley_core::Result<Self> {
        let personas: BTreeMap<String, Persona> = personas
            .into_iter()
            .map(|p| (p.name.clone(), p))
            .collect();
        let default_name = default_name.into();
        if !personas.contains_key(&default_name) {
            return Err(ParleyError::Config(format!(
                "default persona '{default_name}' is not defined"
            )));
        }
        Ok(Self {
            personas,
            default_name,
        })
    }

    /// The shipped `sales` and `workout` personas.
    pub fn builtin() -> parley_core::Result<Vec<Persona>> {
        Ok(vec![
            Persona::new("sales", SALES_TEMPLATE, HistoryFilter::All)?,
            Persona::new("workout", WORKOUT_TEMPLATE, HistoryFilter::HumanOnly)?,
        ])
    }

    /// Built-ins overlaid with `[[personas]]` entries from config.
    pub fn from_config(config: &ParleyConfig) -> parley_core::Result<Self> {
        let mut personas = Self::builtin()?;
        for entry in &config.personas {
            let persona = persona_from_config(entry)?;
            info!(persona = %persona.name, filter = ?persona.history_filter, "persona loaded from config");
            personas.retain(|p| p.name != persona.name);
            personas.push(persona);
        }
        Self::new(personas, config.pipeline.default_persona.clone())
    }

    pub fn get(&self, name: &str) -> Option<&Persona> {
        self.personas.get(name)
    }

    pub fn default_persona(&self) -> &Persona {
        // `new` guarantees the default is present.
        &self.personas[&self.default_name]
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.personas.keys().map(String::as_str)
    }
}

fn persona_from_config(entry: &PersonaConfig) -> parley_core::Result<Persona> {
    let text = entry.load_template()?;
    Persona::new(entry.name.clone(), &text, entry.history_filter)
}
