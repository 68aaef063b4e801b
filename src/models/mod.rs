//! Domain entities and the representation contract shared by both storage backends.
//!
//! Every entity is a typed struct implementing [`Model`]. [`Entity`] wraps the seven
//! kinds so a storage engine can hold a heterogeneous working set keyed by
//! `"<TypeName>.<id>"`. A representation is a flat JSON object carrying the identity
//! fields, ISO-8601 timestamps, every set field and the type tag under [`CLASS_KEY`].

pub mod amenity;
pub mod base;
pub mod city;
pub mod place;
pub mod review;
pub mod state;
pub mod user;

pub use amenity::Amenity;
pub use base::BaseModel;
pub use city::City;
pub use place::Place;
pub use review::Review;
pub use state::State;
pub use user::User;

use crate::{
    errors::{Error, Result},
    storage::Storage,
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use std::{fmt, str::FromStr};

/// Reserved key carrying the concrete type name inside a representation.
pub const CLASS_KEY: &str = "__class__";

/// Keys owned by [`BaseModel`] that callers may not assign directly.
pub const RESERVED_KEYS: [&str; 4] = ["id", "created_at", "updated_at", CLASS_KEY];

/// Canonical key-value form of an entity.
pub type Representation = Map<String, Value>;

/// The known entity kinds.
///
/// Variants are declared parents first, so the derived ordering sorts a batch into an
/// order the relational schema accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    /// Schema-less record carrying only identity and free-form attributes
    BaseModel,
    /// Account owning places and reviews
    User,
    /// Top-level region owning cities
    State,
    /// City within a state, owning places
    City,
    /// Feature that can be attached to many places
    Amenity,
    /// Rentable place within a city
    Place,
    /// Review of a place written by a user
    Review,
}

impl EntityKind {
    /// Every kind, in dependency order (parents before children).
    pub const ALL: [Self; 7] = [
        Self::BaseModel,
        Self::User,
        Self::State,
        Self::City,
        Self::Amenity,
        Self::Place,
        Self::Review,
    ];

    /// The kinds that have a table in the relational schema.
    pub const TABLED: [Self; 6] = [
        Self::State,
        Self::City,
        Self::User,
        Self::Place,
        Self::Review,
        Self::Amenity,
    ];

    /// Type name used in composite keys and in the type tag.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::BaseModel => "BaseModel",
            Self::User => "User",
            Self::State => "State",
            Self::City => "City",
            Self::Amenity => "Amenity",
            Self::Place => "Place",
            Self::Review => "Review",
        }
    }

    /// Builds the composite storage key for an id of this kind.
    #[must_use]
    pub fn key(self, id: &str) -> String {
        format!("{}.{id}", self.name())
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| Error::UnknownType {
                name: name.to_string(),
            })
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Behaviour shared by every typed entity.
///
/// Typed fields are whatever serde serializes for the struct; identity, timestamps
/// and free-form attributes live in the embedded [`BaseModel`].
pub trait Model: Serialize + DeserializeOwned + Default + Clone + Into<Entity> {
    /// Kind tag of this model
    const KIND: EntityKind;
    /// Names of the typed (schema) fields
    const FIELDS: &'static [&'static str];

    /// Identity of the entity
    fn base(&self) -> &BaseModel;

    /// Mutable identity of the entity
    fn base_mut(&mut self) -> &mut BaseModel;

    /// Composite key `"<TypeName>.<id>"`.
    fn key(&self) -> String {
        Self::KIND.key(&self.base().id)
    }

    /// Canonical representation including the type tag.
    fn to_representation(&self) -> Representation {
        to_representation(self)
    }

    /// Rebuilds a model from a representation produced by [`Model::to_representation`].
    ///
    /// # Errors
    /// Returns [`Error::Parse`] if a timestamp or a typed field cannot be parsed.
    fn from_representation(representation: &Representation) -> Result<Self> {
        from_representation(representation)
    }

    /// Assigns an attribute by name, converting it to the field's type when it is a
    /// schema field. Identity keys are silently left untouched.
    ///
    /// # Errors
    /// Returns [`Error::Parse`] if the value cannot be converted to the field's type.
    fn set_attr(&mut self, name: &str, value: Value) -> Result<()> {
        set_attr(self, name, value)
    }
}

fn typed_fields<M: Model>(model: &M) -> Representation {
    match serde_json::to_value(model) {
        Ok(Value::Object(fields)) => fields,
        _ => Map::new(),
    }
}

fn to_representation<M: Model>(model: &M) -> Representation {
    let base = model.base();
    let mut map = Representation::new();
    map.insert("id".to_string(), Value::String(base.id.clone()));
    map.insert(
        "created_at".to_string(),
        Value::String(base::format_timestamp(&base.created_at)),
    );
    map.insert(
        "updated_at".to_string(),
        Value::String(base::format_timestamp(&base.updated_at)),
    );
    map.extend(typed_fields(model));
    map.extend(base.extra.clone());
    map.insert(
        CLASS_KEY.to_string(),
        Value::String(M::KIND.name().to_string()),
    );
    map
}

fn timestamp_value(key: &str, value: &Value) -> Result<chrono::NaiveDateTime> {
    value
        .as_str()
        .ok_or_else(|| Error::Parse {
            message: format!("`{key}` must be an ISO-8601 string, got {value}"),
        })
        .and_then(base::parse_timestamp)
}

fn from_representation<M: Model>(representation: &Representation) -> Result<M> {
    let mut base = BaseModel::new();
    let mut fields = Map::new();
    for (key, value) in representation {
        match key.as_str() {
            CLASS_KEY => {}
            "id" => {
                base.id = value
                    .as_str()
                    .map_or_else(|| value.to_string(), ToString::to_string);
            }
            "created_at" => base.created_at = timestamp_value(key, value)?,
            "updated_at" => base.updated_at = timestamp_value(key, value)?,
            field if M::FIELDS.contains(&field) => {
                fields.insert(key.clone(), value.clone());
            }
            _ => {
                base.extra.insert(key.clone(), value.clone());
            }
        }
    }

    let mut model: M =
        serde_json::from_value(Value::Object(fields)).map_err(|e| Error::Parse {
            message: format!("invalid {} representation: {e}", M::KIND),
        })?;
    *model.base_mut() = base;
    Ok(model)
}

// Values typed on the console arrive as JSON scalars that may not match the field type
// ("5" for an integer field, 42 for a name), so each candidate is tried in turn.
fn coercions(value: Value) -> Vec<Value> {
    let mut candidates = vec![value.clone()];
    match &value {
        Value::String(s) => {
            if let Ok(i) = s.parse::<i64>() {
                candidates.push(Value::from(i));
            }
            if let Ok(f) = s.parse::<f64>() {
                candidates.push(Value::from(f));
            }
        }
        Value::Number(n) => {
            if let Some(i) = n.as_f64().filter(|f| f.fract() == 0.0) {
                #[allow(clippy::cast_possible_truncation)]
                candidates.push(Value::from(i as i64));
            }
            candidates.push(Value::String(n.to_string()));
        }
        Value::Bool(b) => candidates.push(Value::String(b.to_string())),
        _ => {}
    }
    candidates
}

fn set_attr<M: Model>(model: &mut M, name: &str, value: Value) -> Result<()> {
    if RESERVED_KEYS.contains(&name) {
        return Ok(());
    }
    if !M::FIELDS.contains(&name) {
        model.base_mut().extra.insert(name.to_string(), value);
        return Ok(());
    }

    let mut last_error = None;
    for candidate in coercions(value) {
        let mut fields = typed_fields(model);
        fields.insert(name.to_string(), candidate);
        match serde_json::from_value::<M>(Value::Object(fields)) {
            Ok(mut updated) => {
                std::mem::swap(updated.base_mut(), model.base_mut());
                *model = updated;
                return Ok(());
            }
            Err(e) => last_error = Some(e),
        }
    }
    Err(Error::Parse {
        message: format!(
            "invalid value for {}.{name}: {}",
            M::KIND,
            last_error.map_or_else(String::new, |e| e.to_string())
        ),
    })
}

/// Any entity of a known kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    /// A bare [`BaseModel`]
    BaseModel(BaseModel),
    /// A [`User`]
    User(User),
    /// A [`State`]
    State(State),
    /// A [`City`]
    City(City),
    /// An [`Amenity`]
    Amenity(Amenity),
    /// A [`Place`]
    Place(Place),
    /// A [`Review`]
    Review(Review),
}

macro_rules! dispatch {
    ($entity:expr, $model:ident => $body:expr) => {
        match $entity {
            Entity::BaseModel($model) => $body,
            Entity::User($model) => $body,
            Entity::State($model) => $body,
            Entity::City($model) => $body,
            Entity::Amenity($model) => $body,
            Entity::Place($model) => $body,
            Entity::Review($model) => $body,
        }
    };
}

impl Entity {
    /// Creates a fresh entity of the given kind with a new identity.
    #[must_use]
    pub fn fresh(kind: EntityKind) -> Self {
        match kind {
            EntityKind::BaseModel => Self::BaseModel(BaseModel::new()),
            EntityKind::User => Self::User(User::default()),
            EntityKind::State => Self::State(State::default()),
            EntityKind::City => Self::City(City::default()),
            EntityKind::Amenity => Self::Amenity(Amenity::default()),
            EntityKind::Place => Self::Place(Place::default()),
            EntityKind::Review => Self::Review(Review::default()),
        }
    }

    /// Kind of the wrapped model.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::BaseModel(_) => EntityKind::BaseModel,
            Self::User(_) => EntityKind::User,
            Self::State(_) => EntityKind::State,
            Self::City(_) => EntityKind::City,
            Self::Amenity(_) => EntityKind::Amenity,
            Self::Place(_) => EntityKind::Place,
            Self::Review(_) => EntityKind::Review,
        }
    }

    /// Identity of the wrapped model.
    #[must_use]
    pub fn base(&self) -> &BaseModel {
        dispatch!(self, m => m.base())
    }

    /// Mutable identity of the wrapped model.
    pub fn base_mut(&mut self) -> &mut BaseModel {
        dispatch!(self, m => m.base_mut())
    }

    /// Identifier of the wrapped model.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.base().id
    }

    /// Composite key `"<TypeName>.<id>"`.
    #[must_use]
    pub fn key(&self) -> String {
        self.kind().key(self.id())
    }

    /// Canonical representation including the type tag.
    #[must_use]
    pub fn to_representation(&self) -> Representation {
        dispatch!(self, m => m.to_representation())
    }

    /// Rebuilds an entity from a representation, dispatching on its type tag.
    ///
    /// # Errors
    /// Returns [`Error::UnknownType`] if the tag is missing or names no known kind, and
    /// [`Error::Parse`] if a timestamp or typed field is malformed.
    pub fn from_representation(representation: &Representation) -> Result<Self> {
        let tag = representation
            .get(CLASS_KEY)
            .and_then(Value::as_str)
            .unwrap_or_default();
        Ok(match tag.parse::<EntityKind>()? {
            EntityKind::BaseModel => Self::BaseModel(BaseModel::from_representation(representation)?),
            EntityKind::User => Self::User(User::from_representation(representation)?),
            EntityKind::State => Self::State(State::from_representation(representation)?),
            EntityKind::City => Self::City(City::from_representation(representation)?),
            EntityKind::Amenity => Self::Amenity(Amenity::from_representation(representation)?),
            EntityKind::Place => Self::Place(Place::from_representation(representation)?),
            EntityKind::Review => Self::Review(Review::from_representation(representation)?),
        })
    }

    /// Assigns an attribute by name. See [`Model::set_attr`].
    ///
    /// # Errors
    /// Returns [`Error::Parse`] if the value does not fit the field's type.
    pub fn set_attr(&mut self, name: &str, value: Value) -> Result<()> {
        dispatch!(self, m => m.set_attr(name, value))
    }

    /// Refreshes `updated_at`, registers the entity with `storage` and flushes it.
    ///
    /// `updated_at` is refreshed even when the flush fails.
    ///
    /// # Errors
    /// Propagates the backend's `save` failure.
    pub async fn save<S: Storage>(&mut self, storage: &mut S) -> Result<()> {
        self.base_mut().touch();
        storage.new(self.clone());
        storage.save().await
    }

    /// Asks `storage` to delete this entity. The value itself is left intact and must not
    /// be persisted again afterwards.
    ///
    /// # Errors
    /// Propagates the backend's `delete` failure.
    pub async fn delete<S: Storage>(&self, storage: &mut S) -> Result<()> {
        storage.delete(Some(self)).await
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] ({}) {}",
            self.kind(),
            self.id(),
            Value::Object(self.to_representation())
        )
    }
}

/// Implements [`Model`] and the conversions to and from [`Entity`] for a typed struct
/// that embeds its identity in a `base` field.
macro_rules! impl_model {
    ($model:ident, [$($field:literal),* $(,)?]) => {
        impl $crate::models::Model for $model {
            const KIND: $crate::models::EntityKind = $crate::models::EntityKind::$model;
            const FIELDS: &'static [&'static str] = &[$($field),*];

            fn base(&self) -> &$crate::models::BaseModel {
                &self.base
            }

            fn base_mut(&mut self) -> &mut $crate::models::BaseModel {
                &mut self.base
            }
        }

        impl From<$model> for $crate::models::Entity {
            fn from(model: $model) -> Self {
                Self::$model(model)
            }
        }

        impl TryFrom<$crate::models::Entity> for $model {
            type Error = $crate::errors::Error;

            fn try_from(entity: $crate::models::Entity) -> $crate::errors::Result<Self> {
                match entity {
                    $crate::models::Entity::$model(model) => Ok(model),
                    other => Err($crate::errors::Error::UnknownType {
                        name: other.kind().name().to_string(),
                    }),
                }
            }
        }
    };
}
pub(crate) use impl_model;

impl Model for BaseModel {
    const KIND: EntityKind = EntityKind::BaseModel;
    const FIELDS: &'static [&'static str] = &[];

    fn base(&self) -> &BaseModel {
        self
    }

    fn base_mut(&mut self) -> &mut BaseModel {
        self
    }
}

impl From<BaseModel> for Entity {
    fn from(model: BaseModel) -> Self {
        Self::BaseModel(model)
    }
}
