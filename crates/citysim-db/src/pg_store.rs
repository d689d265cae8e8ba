//! `PostgreSQL` implementation of the repository traits.
//!
//! A [`PgStore`] is bound to one city row; every query is scoped by its
//! `city_id`. Queries are built at runtime (not compile-time checked) so the
//! workspace builds without a live database. Enum columns round-trip through
//! their snake_case names, unsigned domain integers through the next wider
//! signed `PostgreSQL` type.

use citysim_types::{
    ActivityEntry, Building, BuildingId, City, CityId, CityTime, Crime, CrimeId, CrimeStatus,
    LandValueUpdate, OfficerId, OwnerId, Parcel, ParcelId, PoliceOfficer, Position, Resident,
    ResidentId, Road, RoadId,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbError;
use crate::repository::{
    ActivityRepository, BuildingRepository, CityRepository, CrimeRepository, OfficerRepository,
    ParcelRepository, ResidentRepository, RoadRepository, WalletRepository,
};

// ---------------------------------------------------------------------------
// Column conversions
// ---------------------------------------------------------------------------

fn to_db_u64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn to_db_u32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn from_db_u64(column: &'static str, value: i64) -> Result<u64, DbError> {
    u64::try_from(value)
        .ok()
        .ok_or(DbError::OutOfRange { column, value })
}

fn from_db_u32(column: &'static str, value: i32) -> Result<u32, DbError> {
    u32::try_from(value).ok().ok_or(DbError::OutOfRange {
        column,
        value: i64::from(value),
    })
}

fn from_db_u8(column: &'static str, value: i16) -> Result<u8, DbError> {
    u8::try_from(value).ok().ok_or(DbError::OutOfRange {
        column,
        value: i64::from(value),
    })
}

/// Map unique-key violations to [`DbError::Conflict`].
fn conflict_or_postgres(err: sqlx::Error, what: &str) -> DbError {
    match err {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            DbError::Conflict(format!("{what}: {db}"))
        }
        other => DbError::Postgres(other),
    }
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `cities` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CityRow {
    /// City ID.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Last persisted tick.
    pub tick: i64,
    /// Last persisted hour.
    pub hour: i32,
    /// Last persisted absolute day.
    pub day: i64,
    /// Last persisted year.
    pub year: i64,
    /// Treasury balance.
    pub treasury: Decimal,
}

impl CityRow {
    fn into_city(self) -> Result<City, DbError> {
        Ok(City {
            id: CityId::from(self.id),
            name: self.name,
            tick: from_db_u64("cities.tick", self.tick)?,
            hour: from_db_u32("cities.hour", self.hour)?,
            day: from_db_u64("cities.day", self.day)?,
            year: from_db_u64("cities.year", self.year)?,
            treasury: self.treasury,
        })
    }
}

/// A row from the `parcels` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ParcelRow {
    /// Parcel ID.
    pub id: Uuid,
    /// Grid column.
    pub x: i32,
    /// Grid row.
    pub y: i32,
    /// Terrain name.
    pub terrain: String,
    /// Zoning name.
    pub zoning: String,
    /// Land value.
    pub land_value: i32,
    /// Owner, if claimed.
    pub owner_id: Option<Uuid>,
}

impl ParcelRow {
    fn into_parcel(self) -> Result<Parcel, DbError> {
        Ok(Parcel {
            id: ParcelId::from(self.id),
            x: self.x,
            y: self.y,
            terrain: self.terrain.parse()?,
            zoning: self.zoning.parse()?,
            land_value: self.land_value,
            owner_id: self.owner_id.map(OwnerId::from),
        })
    }
}

/// A row from the `buildings` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BuildingRow {
    /// Building ID.
    pub id: Uuid,
    /// Parcel ID.
    pub parcel_id: Uuid,
    /// Building type name.
    pub building_type: String,
    /// Floor count.
    pub floors: i32,
    /// Density level.
    pub density: i16,
    /// Construction progress.
    pub construction_progress: i16,
    /// Power flag.
    pub powered: bool,
    /// Owner ID.
    pub owner_id: Uuid,
}

impl BuildingRow {
    fn into_building(self) -> Result<Building, DbError> {
        Ok(Building {
            id: BuildingId::from(self.id),
            parcel_id: ParcelId::from(self.parcel_id),
            building_type: self.building_type.parse()?,
            floors: from_db_u32("buildings.floors", self.floors)?,
            density: from_db_u8("buildings.density", self.density)?,
            construction_progress: from_db_u8(
                "buildings.construction_progress",
                self.construction_progress,
            )?,
            powered: self.powered,
            owner_id: OwnerId::from(self.owner_id),
        })
    }
}

/// A row from the `roads` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RoadRow {
    /// Road ID.
    pub id: Uuid,
    /// Parcel ID.
    pub parcel_id: Uuid,
    /// Direction name.
    pub direction: String,
    /// Lane count.
    pub lanes: i16,
}

impl RoadRow {
    fn into_road(self) -> Result<Road, DbError> {
        Ok(Road {
            id: RoadId::from(self.id),
            parcel_id: ParcelId::from(self.parcel_id),
            direction: self.direction.parse()?,
            lanes: from_db_u8("roads.lanes", self.lanes)?,
        })
    }
}

/// A row from the `residents` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ResidentRow {
    /// Resident ID.
    pub id: Uuid,
    /// Home building.
    pub home_building_id: Uuid,
    /// Workplace, if employed.
    pub work_building_id: Option<Uuid>,
    /// Wage.
    pub salary: Decimal,
    /// Spawn tick.
    pub spawned_at_tick: i64,
}

impl ResidentRow {
    fn into_resident(self) -> Result<Resident, DbError> {
        Ok(Resident {
            id: ResidentId::from(self.id),
            home_building_id: BuildingId::from(self.home_building_id),
            work_building_id: self.work_building_id.map(BuildingId::from),
            salary: self.salary,
            spawned_at_tick: from_db_u64("residents.spawned_at_tick", self.spawned_at_tick)?,
        })
    }
}

/// A row from the `crimes` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CrimeRow {
    /// Crime ID.
    pub id: Uuid,
    /// Crime type name.
    pub crime_type: String,
    /// Parcel ID.
    pub parcel_id: Uuid,
    /// Targeted building.
    pub building_id: Uuid,
    /// Grid column.
    pub x: i32,
    /// Grid row.
    pub y: i32,
    /// Status name.
    pub status: String,
    /// Responding officer.
    pub responding_officer_id: Option<Uuid>,
    /// Damage.
    pub damage: Decimal,
    /// Report tick.
    pub reported_at_tick: i64,
    /// Resolution tick.
    pub resolved_at_tick: Option<i64>,
}

impl CrimeRow {
    fn into_crime(self) -> Result<Crime, DbError> {
        let resolved_at_tick = self
            .resolved_at_tick
            .map(|t| from_db_u64("crimes.resolved_at_tick", t))
            .transpose()?;
        Ok(Crime {
            id: CrimeId::from(self.id),
            crime_type: self.crime_type.parse()?,
            parcel_id: ParcelId::from(self.parcel_id),
            building_id: BuildingId::from(self.building_id),
            x: self.x,
            y: self.y,
            status: self.status.parse()?,
            responding_officer_id: self.responding_officer_id.map(OfficerId::from),
            damage: self.damage,
            reported_at_tick: from_db_u64("crimes.reported_at_tick", self.reported_at_tick)?,
            resolved_at_tick,
        })
    }
}

/// A row from the `police_officers` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OfficerRow {
    /// Officer ID.
    pub id: Uuid,
    /// Station building.
    pub station_id: Uuid,
    /// Horizontal position.
    pub pos_x: f64,
    /// Vertical position.
    pub pos_y: f64,
    /// Status name.
    pub status: String,
    /// Assigned crime.
    pub assigned_crime_id: Option<Uuid>,
}

impl OfficerRow {
    fn into_officer(self) -> Result<PoliceOfficer, DbError> {
        Ok(PoliceOfficer {
            id: OfficerId::from(self.id),
            station_id: BuildingId::from(self.station_id),
            position: Position {
                x: self.pos_x,
                y: self.pos_y,
            },
            status: self.status.parse()?,
            assigned_crime_id: self.assigned_crime_id.map(CrimeId::from),
        })
    }
}

/// A row from the `activity_log` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ActivityRow {
    /// Tick of the activity.
    pub tick: i64,
    /// Activity kind.
    pub kind: String,
    /// Summary line.
    pub message: String,
    /// Structured details.
    pub metadata: serde_json::Value,
    /// Wall-clock timestamp.
    pub created_at: DateTime<Utc>,
}

impl ActivityRow {
    fn into_entry(self) -> Result<ActivityEntry, DbError> {
        Ok(ActivityEntry {
            tick: from_db_u64("activity_log.tick", self.tick)?,
            kind: self.kind,
            message: self.message,
            metadata: self.metadata,
            created_at: self.created_at,
        })
    }
}

const PARCEL_COLUMNS: &str = "id, x, y, terrain, zoning, land_value, owner_id";
const BUILDING_COLUMNS: &str =
    "id, parcel_id, building_type, floors, density, construction_progress, powered, owner_id";
const RESIDENT_COLUMNS: &str =
    "id, home_building_id, work_building_id, salary, spawned_at_tick";
const CRIME_COLUMNS: &str = "id, crime_type, parcel_id, building_id, x, y, status, \
     responding_officer_id, damage, reported_at_tick, resolved_at_tick";
const OFFICER_COLUMNS: &str = "id, station_id, pos_x, pos_y, status, assigned_crime_id";

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// A [`CityStore`](crate::CityStore) backed by `PostgreSQL`, scoped to one
/// city.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    city_id: CityId,
}

impl PgStore {
    /// Bind a store to an existing city row.
    pub const fn new(pool: PgPool, city_id: CityId) -> Self {
        Self { pool, city_id }
    }

    /// Insert a new city row and return a store bound to it.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn create_city(pool: PgPool, city: &City) -> Result<Self, DbError> {
        sqlx::query(
            r"INSERT INTO cities (id, name, tick, hour, day, year, treasury)
              VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(city.id.into_inner())
        .bind(&city.name)
        .bind(to_db_u64(city.tick))
        .bind(to_db_u32(city.hour))
        .bind(to_db_u64(city.day))
        .bind(to_db_u64(city.year))
        .bind(city.treasury)
        .execute(&pool)
        .await?;

        tracing::info!(city_id = %city.id, name = %city.name, "Created city");
        Ok(Self::new(pool, city.id))
    }

    /// Find the most recently created city with the given name.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn find_city(pool: &PgPool, name: &str) -> Result<Option<CityId>, DbError> {
        let id: Option<Uuid> = sqlx::query_scalar(
            r"SELECT id FROM cities WHERE name = $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(name)
        .fetch_optional(pool)
        .await?;
        Ok(id.map(CityId::from))
    }

    /// Bind to the most recent city named `city.name`, or insert `city` if
    /// there is none. The flag is `true` when the city was just created and
    /// still needs seeding.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the lookup or insert fails.
    pub async fn open_city(pool: PgPool, city: &City) -> Result<(Self, bool), DbError> {
        if let Some(city_id) = Self::find_city(&pool, &city.name).await? {
            tracing::info!(%city_id, name = %city.name, "Resuming city");
            return Ok((Self::new(pool, city_id), false));
        }
        Ok((Self::create_city(pool, city).await?, true))
    }

    /// The city this store is bound to.
    pub const fn city_id(&self) -> CityId {
        self.city_id
    }

    /// The underlying connection pool.
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn city_uuid(&self) -> Uuid {
        self.city_id.into_inner()
    }
}

impl CityRepository for PgStore {
    async fn load_city(&self) -> Result<City, DbError> {
        let row = sqlx::query_as::<_, CityRow>(
            r"SELECT id, name, tick, hour, day, year, treasury FROM cities WHERE id = $1",
        )
        .bind(self.city_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.ok_or(DbError::CityNotFound)?.into_city()
    }

    async fn update_city_time(&self, time: &CityTime) -> Result<(), DbError> {
        sqlx::query(r"UPDATE cities SET tick = $2, hour = $3, day = $4, year = $5 WHERE id = $1")
            .bind(self.city_uuid())
            .bind(to_db_u64(time.tick))
            .bind(to_db_u32(time.hour))
            .bind(to_db_u64(time.day))
            .bind(to_db_u64(time.year))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

impl ParcelRepository for PgStore {
    async fn list_parcels(&self) -> Result<Vec<Parcel>, DbError> {
        let rows = sqlx::query_as::<_, ParcelRow>(&format!(
            "SELECT {PARCEL_COLUMNS} FROM parcels WHERE city_id = $1 ORDER BY seq"
        ))
        .bind(self.city_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ParcelRow::into_parcel).collect()
    }

    async fn get_parcel(&self, id: ParcelId) -> Result<Option<Parcel>, DbError> {
        let row = sqlx::query_as::<_, ParcelRow>(&format!(
            "SELECT {PARCEL_COLUMNS} FROM parcels WHERE city_id = $1 AND id = $2"
        ))
        .bind(self.city_uuid())
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await?;
        row.map(ParcelRow::into_parcel).transpose()
    }

    async fn get_parcel_at(&self, x: i32, y: i32) -> Result<Option<Parcel>, DbError> {
        let row = sqlx::query_as::<_, ParcelRow>(&format!(
            "SELECT {PARCEL_COLUMNS} FROM parcels WHERE city_id = $1 AND x = $2 AND y = $3"
        ))
        .bind(self.city_uuid())
        .bind(x)
        .bind(y)
        .fetch_optional(&self.pool)
        .await?;
        row.map(ParcelRow::into_parcel).transpose()
    }

    async fn get_or_create_parcel(&self, x: i32, y: i32) -> Result<Parcel, DbError> {
        let fresh = Parcel::new(x, y);
        sqlx::query(
            r"INSERT INTO parcels (id, city_id, x, y, terrain, zoning, land_value)
              VALUES ($1, $2, $3, $4, $5, $6, $7)
              ON CONFLICT (city_id, x, y) DO NOTHING",
        )
        .bind(fresh.id.into_inner())
        .bind(self.city_uuid())
        .bind(x)
        .bind(y)
        .bind(fresh.terrain.as_str())
        .bind(fresh.zoning.as_str())
        .bind(fresh.land_value)
        .execute(&self.pool)
        .await?;

        self.get_parcel_at(x, y)
            .await?
            .ok_or_else(|| DbError::Conflict(format!("parcel at ({x}, {y}) vanished")))
    }

    async fn save_parcel(&self, parcel: &Parcel) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO parcels (id, city_id, x, y, terrain, zoning, land_value, owner_id)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
              ON CONFLICT (id) DO UPDATE SET
                  x = EXCLUDED.x,
                  y = EXCLUDED.y,
                  terrain = EXCLUDED.terrain,
                  zoning = EXCLUDED.zoning,
                  land_value = EXCLUDED.land_value,
                  owner_id = EXCLUDED.owner_id",
        )
        .bind(parcel.id.into_inner())
        .bind(self.city_uuid())
        .bind(parcel.x)
        .bind(parcel.y)
        .bind(parcel.terrain.as_str())
        .bind(parcel.zoning.as_str())
        .bind(parcel.land_value)
        .bind(parcel.owner_id.map(OwnerId::into_inner))
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_or_postgres(e, "parcel coordinates taken"))?;
        Ok(())
    }

    async fn update_land_values(&self, updates: &[LandValueUpdate]) -> Result<u64, DbError> {
        if updates.is_empty() {
            return Ok(0);
        }

        let ids: Vec<Uuid> = updates.iter().map(|u| u.parcel_id.into_inner()).collect();
        let values: Vec<i32> = updates.iter().map(|u| u.land_value).collect();

        let result = sqlx::query(
            r"UPDATE parcels AS p SET land_value = u.v
              FROM UNNEST($2::UUID[], $3::INT[]) AS u(id, v)
              WHERE p.id = u.id AND p.city_id = $1",
        )
        .bind(self.city_uuid())
        .bind(&ids)
        .bind(&values)
        .execute(&self.pool)
        .await?;

        tracing::debug!(count = updates.len(), "Updated land values (batch UNNEST)");
        Ok(result.rows_affected())
    }
}

impl BuildingRepository for PgStore {
    async fn list_buildings(&self) -> Result<Vec<Building>, DbError> {
        let rows = sqlx::query_as::<_, BuildingRow>(&format!(
            "SELECT {BUILDING_COLUMNS} FROM buildings WHERE city_id = $1 ORDER BY seq"
        ))
        .bind(self.city_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(BuildingRow::into_building).collect()
    }

    async fn get_building(&self, id: BuildingId) -> Result<Option<Building>, DbError> {
        let row = sqlx::query_as::<_, BuildingRow>(&format!(
            "SELECT {BUILDING_COLUMNS} FROM buildings WHERE city_id = $1 AND id = $2"
        ))
        .bind(self.city_uuid())
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await?;
        row.map(BuildingRow::into_building).transpose()
    }

    async fn get_building_on_parcel(
        &self,
        parcel_id: ParcelId,
    ) -> Result<Option<Building>, DbError> {
        let row = sqlx::query_as::<_, BuildingRow>(&format!(
            "SELECT {BUILDING_COLUMNS} FROM buildings WHERE city_id = $1 AND parcel_id = $2"
        ))
        .bind(self.city_uuid())
        .bind(parcel_id.into_inner())
        .fetch_optional(&self.pool)
        .await?;
        row.map(BuildingRow::into_building).transpose()
    }

    async fn create_building(&self, building: &Building) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO buildings (id, city_id, parcel_id, building_type, floors, density, construction_progress, powered, owner_id)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(building.id.into_inner())
        .bind(self.city_uuid())
        .bind(building.parcel_id.into_inner())
        .bind(building.building_type.as_str())
        .bind(to_db_u32(building.floors))
        .bind(i16::from(building.density))
        .bind(i16::from(building.construction_progress))
        .bind(building.powered)
        .bind(building.owner_id.into_inner())
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_or_postgres(e, "parcel already occupied"))?;
        Ok(())
    }

    async fn update_building_density(
        &self,
        id: BuildingId,
        density: u8,
        floors: u32,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            r"UPDATE buildings SET density = $3, floors = $4 WHERE city_id = $1 AND id = $2",
        )
        .bind(self.city_uuid())
        .bind(id.into_inner())
        .bind(i16::from(density))
        .bind(to_db_u32(floors))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_construction_progress(
        &self,
        id: BuildingId,
        progress: u8,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            r"UPDATE buildings SET construction_progress = $3 WHERE city_id = $1 AND id = $2",
        )
        .bind(self.city_uuid())
        .bind(id.into_inner())
        .bind(i16::from(progress))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_powered(&self, powered: bool) -> Result<u64, DbError> {
        let result = sqlx::query(
            r"UPDATE buildings SET powered = $2 WHERE city_id = $1 AND powered <> $2",
        )
        .bind(self.city_uuid())
        .bind(powered)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn delete_building(&self, id: BuildingId) -> Result<bool, DbError> {
        let result = sqlx::query(r"DELETE FROM buildings WHERE city_id = $1 AND id = $2")
            .bind(self.city_uuid())
            .bind(id.into_inner())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

impl RoadRepository for PgStore {
    async fn list_roads(&self) -> Result<Vec<Road>, DbError> {
        let rows = sqlx::query_as::<_, RoadRow>(
            r"SELECT id, parcel_id, direction, lanes FROM roads WHERE city_id = $1 ORDER BY seq",
        )
        .bind(self.city_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(RoadRow::into_road).collect()
    }

    async fn create_road(&self, road: &Road) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO roads (id, city_id, parcel_id, direction, lanes)
              VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(road.id.into_inner())
        .bind(self.city_uuid())
        .bind(road.parcel_id.into_inner())
        .bind(road.direction.as_str())
        .bind(i16::from(road.lanes))
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_or_postgres(e, "parcel already has a road"))?;
        Ok(())
    }

    async fn delete_road(&self, id: RoadId) -> Result<bool, DbError> {
        let result = sqlx::query(r"DELETE FROM roads WHERE city_id = $1 AND id = $2")
            .bind(self.city_uuid())
            .bind(id.into_inner())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

impl ResidentRepository for PgStore {
    async fn list_residents(&self) -> Result<Vec<Resident>, DbError> {
        let rows = sqlx::query_as::<_, ResidentRow>(&format!(
            "SELECT {RESIDENT_COLUMNS} FROM residents WHERE city_id = $1 ORDER BY seq"
        ))
        .bind(self.city_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ResidentRow::into_resident).collect()
    }

    async fn list_residents_by_home(
        &self,
        building_id: BuildingId,
    ) -> Result<Vec<Resident>, DbError> {
        let rows = sqlx::query_as::<_, ResidentRow>(&format!(
            "SELECT {RESIDENT_COLUMNS} FROM residents \
             WHERE city_id = $1 AND home_building_id = $2 ORDER BY seq"
        ))
        .bind(self.city_uuid())
        .bind(building_id.into_inner())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ResidentRow::into_resident).collect()
    }

    async fn list_residents_by_work(
        &self,
        building_id: BuildingId,
    ) -> Result<Vec<Resident>, DbError> {
        let rows = sqlx::query_as::<_, ResidentRow>(&format!(
            "SELECT {RESIDENT_COLUMNS} FROM residents \
             WHERE city_id = $1 AND work_building_id = $2 ORDER BY seq"
        ))
        .bind(self.city_uuid())
        .bind(building_id.into_inner())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ResidentRow::into_resident).collect()
    }

    async fn create_residents(&self, residents: &[Resident]) -> Result<(), DbError> {
        if residents.is_empty() {
            return Ok(());
        }

        let len = residents.len();
        let mut ids = Vec::with_capacity(len);
        let mut homes = Vec::with_capacity(len);
        let mut works: Vec<Option<Uuid>> = Vec::with_capacity(len);
        let mut salaries = Vec::with_capacity(len);
        let mut ticks = Vec::with_capacity(len);

        for resident in residents {
            ids.push(resident.id.into_inner());
            homes.push(resident.home_building_id.into_inner());
            works.push(resident.work_building_id.map(BuildingId::into_inner));
            salaries.push(resident.salary);
            ticks.push(to_db_u64(resident.spawned_at_tick));
        }

        // WITH ORDINALITY keeps `seq` in slice order.
        sqlx::query(
            r"INSERT INTO residents (id, city_id, home_building_id, work_building_id, salary, spawned_at_tick)
              SELECT u.id, $1, u.home, u.work, u.salary, u.tick
              FROM UNNEST($2::UUID[], $3::UUID[], $4::UUID[], $5::NUMERIC[], $6::BIGINT[])
                   WITH ORDINALITY AS u(id, home, work, salary, tick, ord)
              ORDER BY u.ord",
        )
        .bind(self.city_uuid())
        .bind(&ids)
        .bind(&homes)
        .bind(&works)
        .bind(&salaries)
        .bind(&ticks)
        .execute(&self.pool)
        .await?;

        tracing::debug!(count = len, "Inserted residents (batch UNNEST)");
        Ok(())
    }

    async fn update_employment(
        &self,
        id: ResidentId,
        work_building_id: Option<BuildingId>,
        salary: Decimal,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            r"UPDATE residents SET work_building_id = $3, salary = $4 WHERE city_id = $1 AND id = $2",
        )
        .bind(self.city_uuid())
        .bind(id.into_inner())
        .bind(work_building_id.map(BuildingId::into_inner))
        .bind(salary)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_residents_by_home(&self, building_id: BuildingId) -> Result<u64, DbError> {
        let result =
            sqlx::query(r"DELETE FROM residents WHERE city_id = $1 AND home_building_id = $2")
                .bind(self.city_uuid())
                .bind(building_id.into_inner())
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    async fn clear_work_for_building(&self, building_id: BuildingId) -> Result<u64, DbError> {
        let result = sqlx::query(
            r"UPDATE residents SET work_building_id = NULL, salary = 0
              WHERE city_id = $1 AND work_building_id = $2",
        )
        .bind(self.city_uuid())
        .bind(building_id.into_inner())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

impl CrimeRepository for PgStore {
    async fn list_crimes_by_status(&self, status: CrimeStatus) -> Result<Vec<Crime>, DbError> {
        let rows = sqlx::query_as::<_, CrimeRow>(&format!(
            "SELECT {CRIME_COLUMNS} FROM crimes WHERE city_id = $1 AND status = $2 ORDER BY seq"
        ))
        .bind(self.city_uuid())
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(CrimeRow::into_crime).collect()
    }

    async fn get_crime(&self, id: CrimeId) -> Result<Option<Crime>, DbError> {
        let row = sqlx::query_as::<_, CrimeRow>(&format!(
            "SELECT {CRIME_COLUMNS} FROM crimes WHERE city_id = $1 AND id = $2"
        ))
        .bind(self.city_uuid())
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await?;
        row.map(CrimeRow::into_crime).transpose()
    }

    async fn create_crime(&self, crime: &Crime) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO crimes (id, city_id, crime_type, parcel_id, building_id, x, y, status, responding_officer_id, damage, reported_at_tick, resolved_at_tick)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(crime.id.into_inner())
        .bind(self.city_uuid())
        .bind(crime.crime_type.as_str())
        .bind(crime.parcel_id.into_inner())
        .bind(crime.building_id.into_inner())
        .bind(crime.x)
        .bind(crime.y)
        .bind(crime.status.as_str())
        .bind(crime.responding_officer_id.map(OfficerId::into_inner))
        .bind(crime.damage)
        .bind(to_db_u64(crime.reported_at_tick))
        .bind(crime.resolved_at_tick.map(to_db_u64))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_crime(&self, crime: &Crime) -> Result<bool, DbError> {
        let result = sqlx::query(
            r"UPDATE crimes SET status = $3, responding_officer_id = $4, resolved_at_tick = $5
              WHERE city_id = $1 AND id = $2",
        )
        .bind(self.city_uuid())
        .bind(crime.id.into_inner())
        .bind(crime.status.as_str())
        .bind(crime.responding_officer_id.map(OfficerId::into_inner))
        .bind(crime.resolved_at_tick.map(to_db_u64))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

impl OfficerRepository for PgStore {
    async fn list_officers(&self) -> Result<Vec<PoliceOfficer>, DbError> {
        let rows = sqlx::query_as::<_, OfficerRow>(&format!(
            "SELECT {OFFICER_COLUMNS} FROM police_officers WHERE city_id = $1 ORDER BY seq"
        ))
        .bind(self.city_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(OfficerRow::into_officer).collect()
    }

    async fn list_officers_by_station(
        &self,
        station_id: BuildingId,
    ) -> Result<Vec<PoliceOfficer>, DbError> {
        let rows = sqlx::query_as::<_, OfficerRow>(&format!(
            "SELECT {OFFICER_COLUMNS} FROM police_officers \
             WHERE city_id = $1 AND station_id = $2 ORDER BY seq"
        ))
        .bind(self.city_uuid())
        .bind(station_id.into_inner())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(OfficerRow::into_officer).collect()
    }

    async fn get_officer(&self, id: OfficerId) -> Result<Option<PoliceOfficer>, DbError> {
        let row = sqlx::query_as::<_, OfficerRow>(&format!(
            "SELECT {OFFICER_COLUMNS} FROM police_officers WHERE city_id = $1 AND id = $2"
        ))
        .bind(self.city_uuid())
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await?;
        row.map(OfficerRow::into_officer).transpose()
    }

    async fn create_officer(&self, officer: &PoliceOfficer) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO police_officers (id, city_id, station_id, pos_x, pos_y, status, assigned_crime_id)
              VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(officer.id.into_inner())
        .bind(self.city_uuid())
        .bind(officer.station_id.into_inner())
        .bind(officer.position.x)
        .bind(officer.position.y)
        .bind(officer.status.as_str())
        .bind(officer.assigned_crime_id.map(CrimeId::into_inner))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_officer(&self, officer: &PoliceOfficer) -> Result<bool, DbError> {
        let result = sqlx::query(
            r"UPDATE police_officers SET pos_x = $3, pos_y = $4, status = $5, assigned_crime_id = $6
              WHERE city_id = $1 AND id = $2",
        )
        .bind(self.city_uuid())
        .bind(officer.id.into_inner())
        .bind(officer.position.x)
        .bind(officer.position.y)
        .bind(officer.status.as_str())
        .bind(officer.assigned_crime_id.map(CrimeId::into_inner))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

impl WalletRepository for PgStore {
    async fn credit(&self, owner_id: OwnerId, amount: Decimal) -> Result<Decimal, DbError> {
        let balance: Decimal = sqlx::query_scalar(
            r"INSERT INTO wallets (city_id, owner_id, balance) VALUES ($1, $2, $3)
              ON CONFLICT (city_id, owner_id) DO UPDATE SET balance = wallets.balance + EXCLUDED.balance
              RETURNING balance",
        )
        .bind(self.city_uuid())
        .bind(owner_id.into_inner())
        .bind(amount)
        .fetch_one(&self.pool)
        .await?;
        Ok(balance)
    }

    async fn balance(&self, owner_id: OwnerId) -> Result<Decimal, DbError> {
        let balance: Option<Decimal> = sqlx::query_scalar(
            r"SELECT balance FROM wallets WHERE city_id = $1 AND owner_id = $2",
        )
        .bind(self.city_uuid())
        .bind(owner_id.into_inner())
        .fetch_optional(&self.pool)
        .await?;
        Ok(balance.unwrap_or(Decimal::ZERO))
    }
}

impl ActivityRepository for PgStore {
    async fn log_activity(&self, entry: &ActivityEntry) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO activity_log (city_id, tick, kind, message, metadata, created_at)
              VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(self.city_uuid())
        .bind(to_db_u64(entry.tick))
        .bind(&entry.kind)
        .bind(&entry.message)
        .bind(&entry.metadata)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn recent_activity(&self, limit: usize) -> Result<Vec<ActivityEntry>, DbError> {
        let rows = sqlx::query_as::<_, ActivityRow>(
            r"SELECT tick, kind, message, metadata, created_at
              FROM activity_log
              WHERE city_id = $1
              ORDER BY id DESC
              LIMIT $2",
        )
        .bind(self.city_uuid())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ActivityRow::into_entry).collect()
    }
}
