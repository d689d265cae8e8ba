//! The simulation engine: tick loop, subsystem ordering, and public surface.
//!
//! # Tick order
//!
//! Each tick advances the clock, persists the new time, publishes any
//! day/night boundary, then runs the subsystems in a fixed order:
//!
//! 1. Construction
//! 2. Population (drains queued lifecycle notices)
//! 3. Employment
//! 4. Crime
//! 5. Land value
//! 6. Zone evolution
//! 7. Zone build
//!
//! A failing subsystem is logged and skipped; the rest of the tick still
//! runs. Only a clock failure aborts a tick.
//!
//! # Concurrency
//!
//! Per-tick mutable state (clock, simulators, RNG) lives behind a Tokio
//! mutex, so a manual [`SimulationEngine::tick`] never overlaps the loop.
//! The loop uses an interval that skips missed ticks, and [`stop`] lets an
//! in-flight tick finish before the loop exits.
//!
//! [`stop`]: SimulationEngine::stop

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use citysim_db::CityStore;
use citysim_types::{
    Building, BuildingId, City, CityTime, CrimeStatus, DemandSignals, DomainEvent, EngineEvent,
    LifecycleEvent, PopulationStats, TickEvent, TimeEvent,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tokio::sync::{Mutex, Notify, broadcast};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::SimRng;
use crate::catalog::BuildingCatalog;
use crate::clock::CityClock;
use crate::config::SimulationConfig;
use crate::construction::ConstructionSimulator;
use crate::crime::CrimeSimulator;
use crate::demand::DemandCalculator;
use crate::employment::EmploymentSimulator;
use crate::error::SimError;
use crate::land_value::LandValueSimulator;
use crate::population::{LifecycleNotice, PopulationSimulator, population_stats};
use crate::roads::RoadIndex;
use crate::traffic::TrafficModel;
use crate::zone_build::ZoneBuildSimulator;
use crate::zone_evolution::ZoneEvolutionSimulator;

/// Buffered events per subscriber before the slowest one starts lagging.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Full snapshot returned by [`SimulationEngine::state`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineState {
    /// Whether the tick loop is running.
    pub running: bool,
    /// Last completed tick.
    pub tick: u64,
    /// Calendar position at that tick.
    pub time: CityTime,
    /// The persisted city record.
    pub city: City,
    /// Population and capacity figures.
    pub population: PopulationStats,
    /// Current demand signals.
    pub demand: DemandSignals,
    /// Number of buildings, finished or not.
    pub buildings: u64,
    /// Crimes not yet resolved.
    pub open_crimes: u64,
    /// Police officers on the payroll.
    pub officers: u64,
}

/// State mutated by a tick. Only one tick holds it at a time.
struct TickState<S> {
    clock: CityClock,
    construction: ConstructionSimulator<S>,
    population: PopulationSimulator<S>,
    employment: EmploymentSimulator<S>,
    crime: CrimeSimulator<S>,
    land_value: LandValueSimulator<S>,
    zone_evolution: ZoneEvolutionSimulator<S>,
    zone_build: ZoneBuildSimulator<S>,
    roads: Option<RoadIndex>,
    rng: Box<SimRng>,
}

/// Everything the loop task and the handle share.
struct EngineShared<S> {
    store: Arc<S>,
    tick_interval: Duration,
    calendar: CityClock,
    catalog: BuildingCatalog,
    demand: DemandCalculator,
    traffic: TrafficModel,
    running: AtomicBool,
    current_tick: AtomicU64,
    roads_dirty: AtomicBool,
    stop: Notify,
    events: broadcast::Sender<EngineEvent>,
    state: Mutex<TickState<S>>,
    pending: Mutex<Vec<LifecycleNotice>>,
}

/// Drives the city simulation.
pub struct SimulationEngine<S> {
    shared: Arc<EngineShared<S>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<S: CityStore> SimulationEngine<S> {
    /// Build an engine over the store, restoring the clock from the
    /// persisted city tick.
    pub async fn new(store: Arc<S>, config: &SimulationConfig) -> Result<Self, SimError> {
        let city = store.load_city().await?;
        let clock = CityClock::from_tick(&config.time, city.tick)?;
        let calendar = CityClock::new(&config.time)?;
        let ticks_per_hour = clock.ticks_per_hour();

        let state = TickState {
            clock,
            construction: ConstructionSimulator::new(Arc::clone(&store), &config.construction),
            population: PopulationSimulator::new(Arc::clone(&store), &config.population),
            employment: EmploymentSimulator::new(Arc::clone(&store), &config.employment),
            crime: CrimeSimulator::new(
                Arc::clone(&store),
                &config.crime,
                &config.population,
                ticks_per_hour,
            ),
            land_value: LandValueSimulator::new(Arc::clone(&store), &config.land_value),
            zone_evolution: ZoneEvolutionSimulator::new(Arc::clone(&store), &config.zoning),
            zone_build: ZoneBuildSimulator::new(Arc::clone(&store), &config.zoning),
            roads: None,
            rng: Box::new(StdRng::seed_from_u64(config.world.seed)),
        };

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        info!(
            city = %city.name,
            tick = city.tick,
            seed = config.world.seed,
            "simulation engine ready"
        );

        Ok(Self {
            shared: Arc::new(EngineShared {
                store,
                tick_interval: Duration::from_millis(config.world.tick_interval_ms.max(1)),
                calendar,
                catalog: BuildingCatalog::new(&config.population),
                demand: DemandCalculator::new(&config.population),
                traffic: TrafficModel::new(&config.traffic),
                running: AtomicBool::new(false),
                current_tick: AtomicU64::new(city.tick),
                roads_dirty: AtomicBool::new(true),
                stop: Notify::new(),
                events,
                state: Mutex::new(state),
                pending: Mutex::new(Vec::new()),
            }),
            task: Mutex::new(None),
        })
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Start the tick loop. Returns `false` if it was already running.
    pub async fn start(&self) -> bool {
        if self.shared.running.swap(true, Ordering::AcqRel) {
            return false;
        }
        let tick = self.current_tick();
        self.shared
            .publish(EngineEvent::Started(LifecycleEvent { tick }));
        let handle = tokio::spawn(run_loop(Arc::clone(&self.shared)));
        *self.task.lock().await = Some(handle);
        info!(tick, interval_ms = ?self.shared.tick_interval, "tick loop started");
        true
    }

    /// Stop the tick loop, waiting for an in-flight tick to finish. Does
    /// nothing if the loop is not running.
    pub async fn stop(&self) {
        if !self.shared.running.swap(false, Ordering::AcqRel) {
            return;
        }
        self.shared.stop.notify_one();
        let handle = self.task.lock().await.take();
        let joined = match handle {
            Some(handle) => handle.await,
            None => Ok(()),
        };
        if let Err(e) = joined {
            error!(error = %e, "tick loop task failed");
        }
        let tick = self.current_tick();
        self.shared
            .publish(EngineEvent::Stopped(LifecycleEvent { tick }));
        info!(tick, "tick loop stopped");
    }

    /// Whether the tick loop is running.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Last completed tick.
    pub fn current_tick(&self) -> u64 {
        self.shared.current_tick.load(Ordering::Acquire)
    }

    /// Run one tick now. Waits for any in-flight tick first.
    pub async fn tick(&self) -> Result<TickEvent, SimError> {
        self.shared.tick().await
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Snapshot of the city as of the last completed tick.
    pub async fn state(&self) -> Result<EngineState, SimError> {
        let store = &self.shared.store;
        let city = store.load_city().await?;
        let buildings = store.list_buildings().await?;
        let residents = store.list_residents().await?;
        let active = store.list_crimes_by_status(CrimeStatus::Active).await?;
        let responding = store.list_crimes_by_status(CrimeStatus::Responding).await?;
        let officers = store.list_officers().await?;
        let tick = self.current_tick();

        Ok(EngineState {
            running: self.is_running(),
            tick,
            time: self.shared.calendar.time_at(tick),
            city,
            population: population_stats(&self.shared.catalog, &buildings, &residents),
            demand: self.shared.demand.from_world(&buildings, &residents),
            buildings: len_u64(buildings.len()),
            open_crimes: len_u64(active.len().saturating_add(responding.len())),
            officers: len_u64(officers.len()),
        })
    }

    /// Population and capacity figures.
    pub async fn population_stats(&self) -> Result<PopulationStats, SimError> {
        let buildings = self.shared.store.list_buildings().await?;
        let residents = self.shared.store.list_residents().await?;
        Ok(population_stats(
            &self.shared.catalog,
            &buildings,
            &residents,
        ))
    }

    /// How many vehicles the traffic layer should show at `time`.
    pub async fn target_vehicle_count(&self, time: &CityTime) -> Result<u64, SimError> {
        let population = len_u64(self.shared.store.list_residents().await?.len());
        Ok(self.shared.traffic.target_vehicle_count(time, population))
    }

    /// Receive every event the engine publishes from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.shared.events.subscribe()
    }

    /// The store the engine runs against.
    pub fn store(&self) -> &Arc<S> {
        &self.shared.store
    }

    // -----------------------------------------------------------------------
    // Notifications
    // -----------------------------------------------------------------------

    /// Roads were added or removed; rebuild the road index next tick.
    pub fn on_roads_changed(&self) {
        self.shared.roads_dirty.store(true, Ordering::Release);
    }

    /// A building finished outside the construction stage; its residents
    /// spawn on the next tick.
    pub async fn notify_building_completed(&self, building: Building) {
        self.shared
            .pending
            .lock()
            .await
            .push(LifecycleNotice::Completed(building));
    }

    /// A building was demolished; its residents are displaced on the next
    /// tick.
    pub async fn notify_building_demolished(&self, building_id: BuildingId) {
        self.shared
            .pending
            .lock()
            .await
            .push(LifecycleNotice::Demolished(building_id));
    }
}

impl<S: CityStore> EngineShared<S> {
    fn publish(&self, event: EngineEvent) {
        // Sending only fails when nobody is subscribed.
        if self.events.send(event).is_err() {
            debug!("engine event dropped: no subscribers");
        }
    }

    async fn tick(&self) -> Result<TickEvent, SimError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let advance = state.clock.advance()?;
        let time = advance.time;
        self.current_tick.store(time.tick, Ordering::Release);

        if let Err(e) = self.store.update_city_time(&time).await {
            warn!(tick = time.tick, error = %e, "failed to persist city time");
        }
        if advance.day_started {
            info!(day = time.day, year = time.year, "day started");
            self.publish(EngineEvent::DayStarted(TimeEvent { time }));
        }
        if advance.night_started {
            self.publish(EngineEvent::NightStarted(TimeEvent { time }));
        }

        if self.roads_dirty.swap(false, Ordering::AcqRel) || state.roads.is_none() {
            match RoadIndex::load(&*self.store).await {
                Ok(index) => state.roads = Some(index),
                Err(e) => {
                    self.roads_dirty.store(true, Ordering::Release);
                    warn!(error = %e, "failed to rebuild road index");
                }
            }
        }

        let events = self.run_subsystems(state, &time).await;
        let event = TickEvent {
            tick: time.tick,
            time,
            events,
        };
        self.publish(EngineEvent::Tick(event.clone()));
        Ok(event)
    }

    async fn run_subsystems(&self, state: &mut TickState<S>, time: &CityTime) -> Vec<DomainEvent> {
        let tick = time.tick;
        let no_roads = RoadIndex::default();
        let roads = state.roads.as_ref().unwrap_or(&no_roads);
        let mut events = Vec::new();

        match state.construction.simulate().await {
            Ok(outcome) => {
                events.extend(outcome.events);
                self.pending.lock().await.extend(outcome.notices);
            }
            Err(e) => subsystem_failed("construction", tick, &e),
        }

        let notices = std::mem::take(&mut *self.pending.lock().await);
        if !notices.is_empty() {
            events.extend(state.population.process(notices, tick, &mut *state.rng).await);
        }

        match state.employment.simulate(time, &mut *state.rng).await {
            Ok(found) => events.extend(found),
            Err(e) => subsystem_failed("employment", tick, &e),
        }

        match state.crime.simulate(time, &mut *state.rng).await {
            Ok(found) => events.extend(found),
            Err(e) => subsystem_failed("crime", tick, &e),
        }

        match state.land_value.simulate(time, roads).await {
            Ok(found) => events.extend(found),
            Err(e) => subsystem_failed("land_value", tick, &e),
        }

        if state.zone_evolution.is_due(time) || state.zone_build.is_due(tick) {
            let demand = match self.demand.compute(&*self.store).await {
                Ok(demand) => demand,
                Err(e) => {
                    subsystem_failed("demand", tick, &e.into());
                    return events;
                }
            };

            match state.zone_evolution.run_cycle(time, roads, &demand).await {
                Ok(outcome) => {
                    events.extend(outcome.events);
                    self.pending.lock().await.extend(outcome.expansions);
                }
                Err(e) => subsystem_failed("zone_evolution", tick, &e),
            }

            match state
                .zone_build
                .run_cycle(tick, roads, &demand, &mut *state.rng)
                .await
            {
                Ok(found) => events.extend(found),
                Err(e) => subsystem_failed("zone_build", tick, &e),
            }
        }

        events
    }
}

fn subsystem_failed(subsystem: &'static str, tick: u64, error: &SimError) {
    warn!(subsystem, tick, error = %error, "subsystem failed; continuing tick");
}

fn len_u64(len: usize) -> u64 {
    u64::try_from(len).unwrap_or(u64::MAX)
}

/// Tick on every interval until stopped.
async fn run_loop<S: CityStore>(shared: Arc<EngineShared<S>>) {
    let mut interval = tokio::time::interval(shared.tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            () = shared.stop.notified() => break,
            _ = interval.tick() => {
                if let Err(e) = shared.tick().await {
                    error!(error = %e, "tick failed");
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use citysim_db::{BuildingRepository, CityRepository, InMemoryStore, ResidentRepository};
    use citysim_types::{BuildingType, OwnerId, ParcelId};
    use rust_decimal::Decimal;

    use super::*;
    use crate::starting_city::seed_starting_city;

    fn fast_config() -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.world.tick_interval_ms = 1;
        config
    }

    async fn engine() -> SimulationEngine<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new(City::founded("Test", Decimal::ZERO)));
        seed_starting_city(&*store, 4).await.unwrap();
        SimulationEngine::new(store, &fast_config()).await.unwrap()
    }

    #[tokio::test]
    async fn manual_tick_advances_and_persists_time() {
        let engine = engine().await;
        let event = engine.tick().await.unwrap();
        assert_eq!(event.tick, 1);
        assert_eq!(engine.current_tick(), 1);
        let city = engine.store().load_city().await.unwrap();
        assert_eq!(city.tick, 1);
    }

    #[tokio::test]
    async fn tick_events_are_broadcast() {
        let engine = engine().await;
        let mut rx = engine.subscribe();
        engine.tick().await.unwrap();
        let received = rx.recv().await.unwrap();
        assert!(matches!(received, EngineEvent::Tick(TickEvent { tick: 1, .. })));
    }

    #[tokio::test]
    async fn start_and_stop_are_idempotent() {
        let engine = engine().await;
        let mut rx = engine.subscribe();
        assert!(engine.start().await);
        assert!(!engine.start().await);
        assert!(engine.is_running());

        tokio::time::sleep(Duration::from_millis(20)).await;
        engine.stop().await;
        engine.stop().await;
        assert!(!engine.is_running());
        assert!(engine.current_tick() > 0);

        assert!(matches!(rx.recv().await.unwrap(), EngineEvent::Started(_)));
        let mut saw_stopped = false;
        while let Ok(event) = rx.try_recv() {
            saw_stopped |= matches!(event, EngineEvent::Stopped(_));
        }
        assert!(saw_stopped);

        let tick = engine.current_tick();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(engine.current_tick(), tick);
    }

    #[tokio::test]
    async fn first_hour_staffs_police_station() {
        let engine = engine().await;
        for _ in 0..600 {
            engine.tick().await.unwrap();
        }
        let state = engine.state().await.unwrap();
        assert_eq!(state.officers, 3);
        assert_eq!(state.time.hour, 1);
    }

    #[tokio::test]
    async fn notified_completion_spawns_residents_next_tick() {
        let engine = engine().await;
        let house = Building {
            id: BuildingId::new(),
            parcel_id: ParcelId::new(),
            building_type: BuildingType::House,
            floors: 1,
            density: 1,
            construction_progress: 100,
            powered: true,
            owner_id: OwnerId::SYSTEM,
        };
        engine.store().create_building(&house).await.unwrap();
        engine.notify_building_completed(house.clone()).await;

        let event = engine.tick().await.unwrap();
        assert!(event.events.iter().any(|e| e.name() == "resident_spawned"));
        let residents = engine.store().list_residents_by_home(house.id).await.unwrap();
        assert!((2..=4).contains(&residents.len()));

        engine.notify_building_demolished(house.id).await;
        engine.tick().await.unwrap();
        assert!(engine
            .store()
            .list_residents_by_home(house.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn traffic_uses_population() {
        let engine = engine().await;
        let time = engine.state().await.unwrap().time;
        assert_eq!(engine.target_vehicle_count(&time).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn engine_restores_persisted_tick() {
        let store = Arc::new(InMemoryStore::new(City::founded("Test", Decimal::ZERO)));
        let first = SimulationEngine::new(Arc::clone(&store), &fast_config())
            .await
            .unwrap();
        for _ in 0..5 {
            first.tick().await.unwrap();
        }
        let second = SimulationEngine::new(store, &fast_config()).await.unwrap();
        assert_eq!(second.current_tick(), 5);
        assert_eq!(second.tick().await.unwrap().tick, 6);
    }
}
