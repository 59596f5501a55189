//! Typed player statistics: the `PlayerValue` tagged union shared by every
//! column kind, and the per-player storage backing custom columns.

use crate::color::Color;
use crate::context::{Canvas, TextureRef, MAX_PLAYERS};
use log::warn;
use rustc_hash::FxHashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum DataType {
    #[default]
    Unknown,
    Int,
    Bool,
    Float,
    String,
    Color,
    Texture,
}

impl DataType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Int => "int",
            Self::Bool => "bool",
            Self::Float => "float",
            Self::String => "string",
            Self::Color => "color",
            Self::Texture => "texture",
        }
    }
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "int" => Ok(Self::Int),
            "bool" => Ok(Self::Bool),
            "float" => Ok(Self::Float),
            "string" => Ok(Self::String),
            "color" => Ok(Self::Color),
            "texture" => Ok(Self::Texture),
            other => Err(format!("'{other}' is not a valid data type")),
        }
    }
}

/// One heterogeneous statistic value. The discriminant is the type; typed
/// getters never read across it, returning the type's zero/empty value on
/// mismatch instead.
#[derive(Clone, PartialEq, Debug, Default)]
pub enum PlayerValue {
    #[default]
    Unknown,
    Int(i32),
    Bool(bool),
    Float(f32),
    String(String),
    Color(Color),
    /// `None` records a texture lookup that found nothing; the value is
    /// still texture-typed.
    Texture(Option<TextureRef>),
}

impl PlayerValue {
    pub const fn data_type(&self) -> DataType {
        match self {
            Self::Unknown => DataType::Unknown,
            Self::Int(_) => DataType::Int,
            Self::Bool(_) => DataType::Bool,
            Self::Float(_) => DataType::Float,
            Self::String(_) => DataType::String,
            Self::Color(_) => DataType::Color,
            Self::Texture(_) => DataType::Texture,
        }
    }

    #[inline(always)]
    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    pub fn as_int(&self) -> i32 {
        if let Self::Int(v) = self { *v } else { 0 }
    }

    pub fn as_bool(&self) -> bool {
        if let Self::Bool(v) = self { *v } else { false }
    }

    pub fn as_float(&self) -> f32 {
        if let Self::Float(v) = self { *v } else { 0.0 }
    }

    pub fn as_str(&self) -> &str {
        if let Self::String(v) = self { v } else { "" }
    }

    pub fn as_color(&self) -> Color {
        if let Self::Color(v) = self {
            *v
        } else {
            Color::default()
        }
    }

    pub fn as_texture(&self) -> Option<&TextureRef> {
        if let Self::Texture(v) = self {
            v.as_ref()
        } else {
            None
        }
    }

    /// Parses `text` into a value of the given type. Numeric parses fall
    /// back to zero; booleans accept true/false or any numeric; textures
    /// are looked up by name and may resolve to nothing.
    pub fn from_string(kind: DataType, text: &str, canvas: &dyn Canvas) -> PlayerValue {
        let trimmed = text.trim();
        match kind {
            DataType::Unknown => Self::Unknown,
            DataType::Int => Self::Int(trimmed.parse().unwrap_or(0)),
            DataType::Bool => {
                let b = match trimmed.to_ascii_lowercase().as_str() {
                    "true" => true,
                    "false" => false,
                    other => other.parse::<f64>().map(|n| n != 0.0).unwrap_or(false),
                };
                Self::Bool(b)
            }
            DataType::Float => Self::Float(trimmed.parse().unwrap_or(0.0)),
            DataType::Color => Self::Color(Color::from_int(trimmed.parse().unwrap_or(0))),
            DataType::String => Self::String(text.to_string()),
            DataType::Texture => {
                if trimmed.is_empty() {
                    return Self::Texture(None);
                }
                Self::Texture(canvas.texture(trimmed).map(|handle| TextureRef {
                    name: trimmed.to_string(),
                    handle,
                }))
            }
        }
    }
}

/// Diagnostic inverse of `from_string`.
impl fmt::Display for PlayerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => Ok(()),
            Self::Int(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{}", if *v { "true" } else { "false" }),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v}"),
            Self::Color(v) => write!(f, "{}", v.to_int()),
            Self::Texture(Some(t)) => write!(f, "{}", t.name),
            Self::Texture(None) => Ok(()),
        }
    }
}

/// Storage behind one custom column: a value slot per roster position, all
/// sharing one data type. The default is kept as text because fonts and
/// textures are not loaded when definitions parse.
#[derive(Clone, Debug)]
pub struct CustomPlayerData {
    name: String,
    data_type: DataType,
    default_value: String,
    slots: Vec<PlayerValue>,
}

impl CustomPlayerData {
    fn new(name: String, data_type: DataType, default_value: String) -> Self {
        Self {
            name,
            data_type,
            default_value,
            slots: vec![PlayerValue::Unknown; MAX_PLAYERS],
        }
    }

    #[inline(always)]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline(always)]
    pub const fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn value(&self, player: usize) -> PlayerValue {
        self.slots.get(player).cloned().unwrap_or_default()
    }

    /// Stores a value for one player. A value of the wrong type is dropped
    /// with a warning; `Unknown` clears the slot.
    pub fn set_value(&mut self, player: usize, value: PlayerValue) {
        let Some(slot) = self.slots.get_mut(player) else {
            warn!(
                "custom column '{}': player index {player} out of range",
                self.name
            );
            return;
        };
        if !value.is_unknown() && value.data_type() != self.data_type {
            warn!(
                "custom column '{}' holds {} values, ignoring a {} value",
                self.name,
                self.data_type.as_str(),
                value.data_type().as_str()
            );
            return;
        }
        *slot = value;
    }

    /// Resets every slot to the declared default, resolving the default
    /// text now that the backend is available. An empty default clears to
    /// `Unknown`.
    pub fn reset(&mut self, canvas: &dyn Canvas) {
        let default = if self.default_value.is_empty() {
            PlayerValue::Unknown
        } else {
            PlayerValue::from_string(self.data_type, &self.default_value, canvas)
        };
        for slot in &mut self.slots {
            *slot = default.clone();
        }
    }
}

/// All custom-column storage declared by the loaded definitions, indexed by
/// declaration order. Gameplay code addresses entries by column name.
#[derive(Clone, Debug, Default)]
pub struct CustomDataStore {
    entries: Vec<CustomPlayerData>,
    by_name: FxHashMap<String, usize>,
}

impl CustomDataStore {
    pub fn register(
        &mut self,
        name: &str,
        data_type: DataType,
        default_value: String,
    ) -> Result<usize, String> {
        let key = name.to_ascii_lowercase();
        if self.by_name.contains_key(&key) {
            return Err(format!("custom column data '{name}' declared twice"));
        }
        let index = self.entries.len();
        self.entries
            .push(CustomPlayerData::new(name.to_string(), data_type, default_value));
        self.by_name.insert(key, index);
        Ok(index)
    }

    #[inline(always)]
    pub fn get(&self, index: usize) -> Option<&CustomPlayerData> {
        self.entries.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut CustomPlayerData> {
        self.entries.get_mut(index)
    }

    pub fn by_name_mut(&mut self, name: &str) -> Option<&mut CustomPlayerData> {
        let index = *self.by_name.get(&name.to_ascii_lowercase())?;
        self.entries.get_mut(index)
    }

    /// Round/game restart: every entry returns to its default.
    pub fn reset_all(&mut self, canvas: &dyn Canvas) {
        for entry in &mut self.entries {
            entry.reset(canvas);
        }
    }
}
