//! Relational backend - a SQL schema is the system of record.
//!
//! Entities registered with `new` are staged in a session and written by `save` in a
//! single transaction, parents before children. Reads see committed rows overlaid with
//! whatever is still staged. `delete` commits the pending writes together with the
//! delete; the schema's `ON DELETE CASCADE` constraints remove dependents.
//!
//! Free-form attributes have no column. The engine remembers the ones it committed and
//! puts them back on loaded rows until the session is closed. A bare `BaseModel` has no
//! table and is never staged.

mod convert;

use super::{Objects, Relation, Storage};
use crate::{
    config::database::{self, DatabaseConfig},
    entities::{
        AmenityTable, CityTable, PlaceAmenityTable, PlaceTable, ReviewTable, StateTable,
        UserTable, amenity, city, place, place_amenity, review,
    },
    errors::{Error, Result},
    models::{Entity, EntityKind},
};
use convert::{
    amenity_links, amenity_row, city_row, place_from_row, place_row, review_row, state_row,
    user_row,
};
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, IntoActiveModel, QueryFilter, Select, TransactionTrait,
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

/// Entities waiting for the next commit, in staging order, and the free-form
/// attributes of the ones already committed.
#[derive(Debug, Default)]
struct Session {
    staged: Vec<Entity>,
    extras: HashMap<String, Map<String, Value>>,
}

impl Session {
    fn stage(&mut self, entity: Entity) {
        let key = entity.key();
        match self.staged.iter_mut().find(|staged| staged.key() == key) {
            Some(slot) => *slot = entity,
            None => self.staged.push(entity),
        }
    }

    fn get(&self, key: &str) -> Option<&Entity> {
        self.staged.iter().find(|staged| staged.key() == key)
    }

    fn remove(&mut self, key: &str) {
        self.staged.retain(|staged| staged.key() != key);
    }

    fn take(&mut self) -> Vec<Entity> {
        std::mem::take(&mut self.staged)
    }

    fn clear(&mut self) {
        self.staged.clear();
        self.extras.clear();
    }

    fn remember(&mut self, committed: &[Entity]) {
        for entity in committed {
            let extra = &entity.base().extra;
            if extra.is_empty() {
                self.extras.remove(&entity.key());
            } else {
                self.extras.insert(entity.key(), extra.clone());
            }
        }
    }

    fn forget(&mut self, key: &str) {
        self.extras.remove(key);
    }

    /// Puts remembered free-form attributes back on a loaded row.
    fn restore(&self, mut entity: Entity) -> Entity {
        if let Some(extra) = self.extras.get(&entity.key()) {
            entity.base_mut().extra.clone_from(extra);
        }
        entity
    }

    fn of_kind(&self, kind: EntityKind) -> impl Iterator<Item = &Entity> {
        self.staged.iter().filter(move |staged| staged.kind() == kind)
    }
}

/// `SeaORM`-backed storage.
#[derive(Debug)]
pub struct DbStorage {
    config: DatabaseConfig,
    connection: Option<DatabaseConnection>,
    session: Session,
}

impl DbStorage {
    /// Creates an engine for `config`. No connection is opened until
    /// [`Storage::reload`].
    #[must_use]
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config,
            connection: None,
            session: Session::default(),
        }
    }

    fn connection(&self) -> Result<&DatabaseConnection> {
        self.connection.as_ref().ok_or_else(|| Error::Transaction {
            message: "storage not initialized: call reload first".to_string(),
        })
    }

    /// Number of entities waiting for the next commit.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.session.staged.len()
    }

    #[instrument(skip(self))]
    async fn load(&self, kind: EntityKind) -> Result<Vec<Entity>> {
        let db = self.connection()?;
        Ok(match kind {
            EntityKind::BaseModel => Vec::new(),
            EntityKind::State => StateTable::find()
                .all(db)
                .await?
                .into_iter()
                .map(|row| Entity::State(row.into()))
                .collect(),
            EntityKind::City => CityTable::find()
                .all(db)
                .await?
                .into_iter()
                .map(|row| Entity::City(row.into()))
                .collect(),
            EntityKind::User => UserTable::find()
                .all(db)
                .await?
                .into_iter()
                .map(|row| Entity::User(row.into()))
                .collect(),
            EntityKind::Amenity => AmenityTable::find()
                .all(db)
                .await?
                .into_iter()
                .map(|row| Entity::Amenity(row.into()))
                .collect(),
            EntityKind::Review => ReviewTable::find()
                .all(db)
                .await?
                .into_iter()
                .map(|row| Entity::Review(row.into()))
                .collect(),
            EntityKind::Place => hydrate_places(db, PlaceTable::find()).await?,
        })
    }

    /// Committed children of `parent`, straight from the schema.
    async fn query_related(&self, parent: &Entity, relation: Relation) -> Result<Vec<Entity>> {
        let db = self.connection()?;
        let id = parent.id();
        Ok(match relation {
            Relation::StateCities => CityTable::find()
                .filter(city::Column::StateId.eq(id))
                .all(db)
                .await?
                .into_iter()
                .map(|row| Entity::City(row.into()))
                .collect(),
            Relation::CityPlaces => {
                hydrate_places(db, PlaceTable::find().filter(place::Column::CityId.eq(id))).await?
            }
            Relation::UserPlaces => {
                hydrate_places(db, PlaceTable::find().filter(place::Column::UserId.eq(id))).await?
            }
            Relation::UserReviews => ReviewTable::find()
                .filter(review::Column::UserId.eq(id))
                .all(db)
                .await?
                .into_iter()
                .map(|row| Entity::Review(row.into()))
                .collect(),
            Relation::PlaceReviews => ReviewTable::find()
                .filter(review::Column::PlaceId.eq(id))
                .all(db)
                .await?
                .into_iter()
                .map(|row| Entity::Review(row.into()))
                .collect(),
            Relation::PlaceAmenities => {
                let query = match self.session.get(&parent.key()) {
                    Some(Entity::Place(staged)) => AmenityTable::find()
                        .filter(amenity::Column::Id.is_in(staged.amenity_ids.clone())),
                    _ => AmenityTable::find()
                        .inner_join(PlaceAmenityTable)
                        .filter(place_amenity::Column::PlaceId.eq(id)),
                };
                query
                    .all(db)
                    .await?
                    .into_iter()
                    .map(|row| Entity::Amenity(row.into()))
                    .collect()
            }
            Relation::AmenityPlaces => {
                let query = PlaceTable::find()
                    .inner_join(PlaceAmenityTable)
                    .filter(place_amenity::Column::AmenityId.eq(id));
                hydrate_places(db, query).await?
            }
        })
    }
}

/// Loads the places selected by `query` together with their amenity ids.
async fn hydrate_places<C: ConnectionTrait>(
    db: &C,
    query: Select<PlaceTable>,
) -> Result<Vec<Entity>> {
    let rows = query.all(db).await?;
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<String> = rows.iter().map(|row| row.id.clone()).collect();
    let mut links: HashMap<String, Vec<String>> = HashMap::new();
    for link in PlaceAmenityTable::find()
        .filter(place_amenity::Column::PlaceId.is_in(ids))
        .all(db)
        .await?
    {
        links.entry(link.place_id).or_default().push(link.amenity_id);
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let mut amenity_ids = links.remove(&row.id).unwrap_or_default();
            amenity_ids.sort();
            Entity::Place(place_from_row(row, amenity_ids))
        })
        .collect())
}

/// Inserts `row`, or updates it when `existing` finds a committed row with its key.
async fn upsert<A, C>(db: &C, existing: Select<A::Entity>, row: A) -> Result<()>
where
    A: ActiveModelTrait + ActiveModelBehavior + Send,
    <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
    C: ConnectionTrait,
{
    if existing.one(db).await?.is_some() {
        row.update(db).await?;
    } else {
        row.insert(db).await?;
    }
    Ok(())
}

/// Writes every staged entity, parents first, and then the amenity links of the staged
/// places.
async fn write_staged<C: ConnectionTrait>(db: &C, staged: &[Entity]) -> Result<()> {
    let mut ordered: Vec<&Entity> = staged.iter().collect();
    ordered.sort_by_key(|entity| entity.kind());
    for entity in ordered {
        let id = entity.id();
        match entity {
            Entity::BaseModel(_) => {}
            Entity::State(model) => upsert(db, StateTable::find_by_id(id), state_row(model)?).await?,
            Entity::City(model) => upsert(db, CityTable::find_by_id(id), city_row(model)?).await?,
            Entity::User(model) => upsert(db, UserTable::find_by_id(id), user_row(model)?).await?,
            Entity::Amenity(model) => {
                upsert(db, AmenityTable::find_by_id(id), amenity_row(model)?).await?;
            }
            Entity::Place(model) => upsert(db, PlaceTable::find_by_id(id), place_row(model)?).await?,
            Entity::Review(model) => {
                upsert(db, ReviewTable::find_by_id(id), review_row(model)?).await?;
            }
        }
    }

    // Links go last so every linked amenity already has its row.
    for entity in staged {
        if let Entity::Place(model) = entity {
            PlaceAmenityTable::delete_many()
                .filter(place_amenity::Column::PlaceId.eq(model.base.id.as_str()))
                .exec(db)
                .await?;
            let links = amenity_links(model);
            if !links.is_empty() {
                PlaceAmenityTable::insert_many(links)
                    .exec_without_returning(db)
                    .await?;
            }
        }
    }
    Ok(())
}

async fn delete_row<C: ConnectionTrait>(db: &C, entity: &Entity) -> Result<u64> {
    let id = entity.id();
    let result = match entity.kind() {
        EntityKind::BaseModel => return Ok(0),
        EntityKind::State => StateTable::delete_by_id(id).exec(db).await?,
        EntityKind::City => CityTable::delete_by_id(id).exec(db).await?,
        EntityKind::User => UserTable::delete_by_id(id).exec(db).await?,
        EntityKind::Amenity => AmenityTable::delete_by_id(id).exec(db).await?,
        EntityKind::Place => PlaceTable::delete_by_id(id).exec(db).await?,
        EntityKind::Review => ReviewTable::delete_by_id(id).exec(db).await?,
    };
    Ok(result.rows_affected)
}

impl Storage for DbStorage {
    async fn all(&self, kind: Option<EntityKind>) -> Result<Objects> {
        let kinds = kind.map_or_else(|| EntityKind::TABLED.to_vec(), |kind| vec![kind]);
        let mut objects = Objects::new();
        for kind in kinds {
            for entity in self.load(kind).await? {
                objects.insert(entity.key(), self.session.restore(entity));
            }
            for staged in self.session.of_kind(kind) {
                objects.insert(staged.key(), staged.clone());
            }
        }
        Ok(objects)
    }

    fn new(&mut self, entity: Entity) {
        if entity.kind() == EntityKind::BaseModel {
            warn!(key = %entity.key(), "BaseModel has no table, not staging it");
            return;
        }
        debug!(key = %entity.key(), "Staging object");
        self.session.stage(entity);
    }

    #[instrument(skip(self))]
    async fn save(&mut self) -> Result<()> {
        let db = self.connection()?.clone();
        let staged = self.session.take();
        if staged.is_empty() {
            return Ok(());
        }

        let txn = db.begin().await?;
        write_staged(&txn, &staged).await?;
        txn.commit().await?;

        self.session.remember(&staged);
        info!("Committed {} objects", staged.len());
        Ok(())
    }

    #[instrument(skip(self, entity))]
    async fn delete(&mut self, entity: Option<&Entity>) -> Result<()> {
        let Some(entity) = entity else {
            return Ok(());
        };
        let db = self.connection()?.clone();
        self.session.remove(&entity.key());
        let staged = self.session.take();

        let txn = db.begin().await?;
        write_staged(&txn, &staged).await?;
        let removed = delete_row(&txn, entity).await?;
        txn.commit().await?;
        self.session.remember(&staged);
        self.session.forget(&entity.key());

        if removed > 0 {
            info!(key = %entity.key(), "Deleted object");
        } else {
            debug!(key = %entity.key(), "Nothing to delete");
        }
        Ok(())
    }

    async fn reload(&mut self) -> Result<()> {
        if self.connection.is_none() {
            let db = database::create_connection(&self.config).await?;
            if self.config.test_mode {
                warn!("Test mode: dropping every table");
                database::drop_tables(&db).await?;
            }
            self.connection = Some(db);
        }
        database::create_tables(self.connection()?).await?;
        self.session.clear();
        Ok(())
    }

    async fn close(&mut self) {
        if self.pending() > 0 {
            debug!("Discarding {} staged objects", self.pending());
        }
        self.session.clear();
    }

    async fn related(&self, parent: &Entity, relation: Relation) -> Result<Vec<Entity>> {
        relation.check_parent(parent)?;
        let mut found: Objects = self
            .query_related(parent, relation)
            .await?
            .into_iter()
            .map(|entity| (entity.key(), self.session.restore(entity)))
            .collect();

        let staged_parent = self.session.get(&parent.key());
        let parent = staged_parent.unwrap_or(parent);
        for child in self.session.of_kind(relation.child()) {
            let key = child.key();
            if relation == Relation::PlaceAmenities && staged_parent.is_none() {
                // Links of a committed place live only in the junction table.
                if let Some(slot) = found.get_mut(&key) {
                    *slot = child.clone();
                }
            } else if relation.matches(parent, child) {
                found.insert(key, child.clone());
            } else {
                found.remove(&key);
            }
        }
        Ok(found.into_values().collect())
    }
}
