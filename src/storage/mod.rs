//! Storage engine - one contract, two interchangeable backends.
//!
//! [`Storage`] is the six-operation contract (`all`, `new`, `save`, `delete`, `reload`,
//! `close`) plus relationship resolution. [`FileStorage`] keeps the working set in memory
//! and a JSON document on disk; [`DbStorage`] stages changes in a session and commits them
//! to a relational schema. [`Engine`] picks one of the two from [`AppConfig`] at start-up
//! and is then passed explicitly to every consumer.
//!
//! Both backends return the same shape from `all` (a fresh map keyed by
//! `"<TypeName>.<id>"`). They differ in delete semantics: the relational schema cascades
//! deletes to dependents, while the file backend removes only the entity it is given.
//!
//! Engines are not shared between tasks: every operation takes `&mut self` or `&self` on
//! an engine owned by a single caller.

pub mod db;
pub mod file;

pub use db::DbStorage;
pub use file::FileStorage;

use crate::{
    config::{AppConfig, BackendKind},
    errors::{Error, Result},
    models::{Entity, EntityKind},
};
use std::collections::BTreeMap;

/// Working-set snapshot keyed by `"<TypeName>.<id>"`.
pub type Objects = BTreeMap<String, Entity>;

/// Parent-to-children relationships resolved by [`Storage::related`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// Cities whose `state_id` is the state
    StateCities,
    /// Places whose `city_id` is the city
    CityPlaces,
    /// Places whose `user_id` is the user
    UserPlaces,
    /// Reviews whose `user_id` is the user
    UserReviews,
    /// Reviews whose `place_id` is the place
    PlaceReviews,
    /// Amenities linked to the place
    PlaceAmenities,
    /// Places linked to the amenity
    AmenityPlaces,
}

impl Relation {
    /// Kind the relation starts from.
    #[must_use]
    pub const fn parent(self) -> EntityKind {
        match self {
            Self::StateCities => EntityKind::State,
            Self::CityPlaces => EntityKind::City,
            Self::UserPlaces | Self::UserReviews => EntityKind::User,
            Self::PlaceReviews | Self::PlaceAmenities => EntityKind::Place,
            Self::AmenityPlaces => EntityKind::Amenity,
        }
    }

    /// Kind the relation yields.
    #[must_use]
    pub const fn child(self) -> EntityKind {
        match self {
            Self::StateCities => EntityKind::City,
            Self::CityPlaces | Self::UserPlaces | Self::AmenityPlaces => EntityKind::Place,
            Self::UserReviews | Self::PlaceReviews => EntityKind::Review,
            Self::PlaceAmenities => EntityKind::Amenity,
        }
    }

    /// Whether `child` is reachable from `parent` through this relation, judged from the
    /// foreign keys (or amenity ids) the two values carry.
    #[must_use]
    pub fn matches(self, parent: &Entity, child: &Entity) -> bool {
        let parent_id = Some(parent.id());
        match (self, parent, child) {
            (Self::StateCities, _, Entity::City(city)) => city.state_id.as_deref() == parent_id,
            (Self::CityPlaces, _, Entity::Place(place)) => place.city_id.as_deref() == parent_id,
            (Self::UserPlaces, _, Entity::Place(place)) => place.user_id.as_deref() == parent_id,
            (Self::UserReviews, _, Entity::Review(review)) => {
                review.user_id.as_deref() == parent_id
            }
            (Self::PlaceReviews, _, Entity::Review(review)) => {
                review.place_id.as_deref() == parent_id
            }
            (Self::PlaceAmenities, Entity::Place(place), Entity::Amenity(amenity)) => {
                place.amenity_ids.contains(&amenity.base.id)
            }
            (Self::AmenityPlaces, _, Entity::Place(place)) => {
                place.amenity_ids.iter().any(|id| Some(id.as_str()) == parent_id)
            }
            _ => false,
        }
    }

    pub(crate) fn check_parent(self, parent: &Entity) -> Result<()> {
        if parent.kind() == self.parent() {
            Ok(())
        } else {
            Err(Error::UnknownType {
                name: format!("{} is not the parent of {self:?}", parent.kind()),
            })
        }
    }
}

/// The storage contract shared by both backends.
#[allow(async_fn_in_trait)]
pub trait Storage {
    /// Returns every entity, or only those of `kind`, as a fresh map.
    async fn all(&self, kind: Option<EntityKind>) -> Result<Objects>;

    /// Registers `entity` in the working set, replacing any entry with the same key.
    /// Nothing is made durable until [`Storage::save`].
    fn new(&mut self, entity: Entity);

    /// Makes the working set durable.
    async fn save(&mut self) -> Result<()>;

    /// Removes `entity`. `None` and unknown entities are ignored.
    async fn delete(&mut self, entity: Option<&Entity>) -> Result<()>;

    /// (Re)loads the working set from the backing medium.
    async fn reload(&mut self) -> Result<()>;

    /// Releases per-session resources.
    async fn close(&mut self);

    /// Entities reachable from `parent` through `relation`.
    async fn related(&self, parent: &Entity, relation: Relation) -> Result<Vec<Entity>>;

    /// Looks up one entity by kind and id.
    async fn get(&self, kind: EntityKind, id: &str) -> Result<Option<Entity>> {
        Ok(self.all(Some(kind)).await?.remove(&kind.key(id)))
    }

    /// Number of entities of `kind`, or of every kind.
    async fn count(&self, kind: Option<EntityKind>) -> Result<usize> {
        Ok(self.all(kind).await?.len())
    }
}

/// A storage engine chosen by configuration at process start.
#[derive(Debug)]
pub enum Engine {
    /// JSON document backend
    File(FileStorage),
    /// Relational backend
    Db(DbStorage),
}

impl Engine {
    /// Builds the backend selected by `config`. Nothing is loaded until
    /// [`Storage::reload`] is called.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        match config.storage.backend {
            BackendKind::File => Self::File(FileStorage::new(&config.storage.file_path)),
            BackendKind::Db => Self::Db(DbStorage::new(config.database.clone())),
        }
    }
}

impl Storage for Engine {
    async fn all(&self, kind: Option<EntityKind>) -> Result<Objects> {
        match self {
            Self::File(storage) => storage.all(kind).await,
            Self::Db(storage) => storage.all(kind).await,
        }
    }

    fn new(&mut self, entity: Entity) {
        match self {
            Self::File(storage) => storage.new(entity),
            Self::Db(storage) => storage.new(entity),
        }
    }

    async fn save(&mut self) -> Result<()> {
        match self {
            Self::File(storage) => storage.save().await,
            Self::Db(storage) => storage.save().await,
        }
    }

    async fn delete(&mut self, entity: Option<&Entity>) -> Result<()> {
        match self {
            Self::File(storage) => storage.delete(entity).await,
            Self::Db(storage) => storage.delete(entity).await,
        }
    }

    async fn reload(&mut self) -> Result<()> {
        match self {
            Self::File(storage) => storage.reload().await,
            Self::Db(storage) => storage.reload().await,
        }
    }

    async fn close(&mut self) {
        match self {
            Self::File(storage) => storage.close().await,
            Self::Db(storage) => storage.close().await,
        }
    }

    async fn related(&self, parent: &Entity, relation: Relation) -> Result<Vec<Entity>> {
        match self {
            Self::File(storage) => storage.related(parent, relation).await,
            Self::Db(storage) => storage.related(parent, relation).await,
        }
    }

    async fn get(&self, kind: EntityKind, id: &str) -> Result<Option<Entity>> {
        match self {
            Self::File(storage) => storage.get(kind, id).await,
            Self::Db(storage) => storage.get(kind, id).await,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::models::{Amenity, City, Model, Place, Review, State, User};
    use crate::test_utils::{file_engine, init_test_tracing, memory_db_engine};

    /// Drives the same sequence of calls through `storage` and returns the
    /// representations it ends up with.
    async fn scripted_session<S: Storage>(
        storage: &mut S,
        entities: &[Entity],
    ) -> Result<Vec<crate::models::Representation>> {
        for entity in entities {
            storage.new(entity.clone());
        }
        storage.save().await?;
        storage.delete(entities.last()).await?;
        storage.save().await?;
        Ok(storage
            .all(None)
            .await?
            .values()
            .map(Entity::to_representation)
            .collect())
    }

    fn sample_graph() -> Vec<Entity> {
        let state = State::named("California");
        let city = City::new(&state.base.id, "San Francisco");
        let user = User::new("a@b.c", "pwd");
        let mut place = Place::new(&city.base.id, &user.base.id, "Loft");
        place.number_rooms = 2;
        place.latitude = Some(37.773_972);
        let wifi = Amenity::named("Wifi");
        place.add_amenity(&wifi);
        let review = Review::new(&place.base.id, &user.base.id, "Lovely");
        let spare = Amenity::named("Spare");
        vec![
            state.into(),
            city.into(),
            user.into(),
            wifi.into(),
            place.into(),
            review.into(),
            spare.into(),
        ]
    }

    #[tokio::test]
    async fn test_backend_parity() -> Result<()> {
        init_test_tracing();
        let mut graph = sample_graph();
        // linked after wifi, but its id sorts first
        let mut pool = Amenity::named("Pool");
        pool.base.id = "0-pool".to_string();
        let Entity::Place(place) = &mut graph[4] else {
            panic!("sample graph has its place at index 4");
        };
        place.add_amenity(&pool);
        graph.insert(0, pool.into());

        let (_dir, mut file) = file_engine().await?;
        let mut db = memory_db_engine().await?;

        let from_file = scripted_session(&mut file, &graph).await?;
        let from_db = scripted_session(&mut db, &graph).await?;

        assert_eq!(from_file.len(), graph.len() - 1);
        assert_eq!(from_file, from_db);
        let place = from_db
            .iter()
            .find(|repr| repr["__class__"] == "Place")
            .unwrap();
        assert_eq!(place["amenity_ids"].as_array().unwrap().len(), 2);
        assert_eq!(place["amenity_ids"][0], "0-pool");
        Ok(())
    }

    #[tokio::test]
    async fn test_key_format_is_shared() -> Result<()> {
        let state = State::named("Nevada");
        let key = state.key();
        let (_dir, mut file) = file_engine().await?;
        let mut db = memory_db_engine().await?;

        for engine in [&mut file, &mut db] {
            engine.new(state.clone().into());
            engine.save().await?;
            let all = engine.all(Some(EntityKind::State)).await?;
            assert_eq!(all.keys().collect::<Vec<_>>(), vec![&key]);
            assert_eq!(engine.count(None).await?, 1);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_related_parity_without_deletes() -> Result<()> {
        let graph = sample_graph();
        let (_dir, mut file) = file_engine().await?;
        let mut db = memory_db_engine().await?;

        for engine in [&mut file, &mut db] {
            for entity in &graph {
                engine.new(entity.clone());
            }
            engine.save().await?;
            let state = &graph[0];
            let cities = engine.related(state, Relation::StateCities).await?;
            assert_eq!(cities, vec![graph[1].clone()]);

            let place = &graph[4];
            let amenities = engine.related(place, Relation::PlaceAmenities).await?;
            assert_eq!(amenities, vec![graph[3].clone()]);

            let places = engine.related(&graph[3], Relation::AmenityPlaces).await?;
            assert_eq!(places, vec![graph[4].clone()]);

            let reviews = engine.related(&graph[2], Relation::UserReviews).await?;
            assert_eq!(reviews, vec![graph[5].clone()]);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_related_rejects_wrong_parent() -> Result<()> {
        let (_dir, file) = file_engine().await?;
        let city = Entity::fresh(EntityKind::City);
        let result = file.related(&city, Relation::StateCities).await;
        assert!(matches!(result.unwrap_err(), Error::UnknownType { name: _ }));
        Ok(())
    }

    #[test]
    fn test_relation_kinds() {
        assert_eq!(Relation::StateCities.child(), EntityKind::City);
        assert_eq!(Relation::AmenityPlaces.parent(), EntityKind::Amenity);
        assert_eq!(Relation::UserReviews.child(), EntityKind::Review);
    }
}
