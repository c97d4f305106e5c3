use geoquery::{
    CommandOutcome, Geometry, Item, LiveFence, MemoryCollection, Message, ScriptEngine,
    ScriptFilter, SearchConfig, SearchEngine, SearchError, SearchReply, SearchResult,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Runs a test between a setup and a teardown step.
///
/// The teardown runs whether or not the test body fails.
pub fn run_test<T, B, A>(before: B, test: T, after: A)
where
    T: Fn(&TestContext) -> SearchResult<()>,
    B: Fn() -> SearchResult<TestContext>,
    A: Fn(&TestContext) -> SearchResult<()>,
{
    let ctx = match before() {
        Ok(ctx) => ctx,
        Err(e) => panic!("Before run failed: {:?}", e),
    };
    let result = test(&ctx);
    let after_result = after(&ctx);
    if let Err(e) = result {
        panic!("Test failed: {:?}", e);
    }
    if let Err(e) = after_result {
        panic!("After run failed: {:?}", e);
    }
}

/// Counts compiled and released script filters.
#[derive(Default)]
pub struct ScriptCounters {
    pub compiled: AtomicUsize,
    pub released: AtomicUsize,
}

impl ScriptCounters {
    pub fn compiled(&self) -> usize {
        self.compiled.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

/// A script engine understanding two scripts:
/// `min_field` keeps items whose field `args[0]` is at least `args[1]`,
/// `fault` fails on every call.
pub struct TestScriptEngine {
    counters: Arc<ScriptCounters>,
}

struct TestScript {
    fault: bool,
    counters: Arc<ScriptCounters>,
}

impl ScriptEngine for TestScriptEngine {
    fn compile(&self, script: &str) -> SearchResult<Box<dyn ScriptFilter>> {
        let fault = match script {
            "min_field" => false,
            "fault" => true,
            other => return Err(SearchError::Evaluator(format!("unknown script {}", other))),
        };
        self.counters.compiled.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(TestScript {
            fault,
            counters: self.counters.clone(),
        }))
    }
}

impl ScriptFilter for TestScript {
    fn eval(&self, item: &Item, args: &[String]) -> SearchResult<bool> {
        if self.fault {
            return Err(SearchError::Evaluator("attempt to index a nil value".to_string()));
        }
        let field = args
            .first()
            .ok_or_else(|| SearchError::Evaluator("missing field".to_string()))?;
        let min: f64 = args
            .get(1)
            .and_then(|a| a.parse().ok())
            .ok_or_else(|| SearchError::Evaluator("missing minimum".to_string()))?;
        Ok(item.field(field).unwrap_or(0.0) >= min)
    }

    fn close(&mut self) {
        self.counters.released.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct TestContext {
    engine: SearchEngine,
    fleet: MemoryCollection,
    fruit: MemoryCollection,
    scripts: Arc<ScriptCounters>,
}

impl TestContext {
    pub fn engine(&self) -> &SearchEngine {
        &self.engine
    }

    pub fn fleet(&self) -> &MemoryCollection {
        &self.fleet
    }

    pub fn fruit(&self) -> &MemoryCollection {
        &self.fruit
    }

    pub fn scripts(&self) -> &ScriptCounters {
        &self.scripts
    }

    pub fn run(&self, line: &str) -> SearchResult<CommandOutcome> {
        self.engine.execute(&Message::parse(line))
    }

    /// Runs a command that must produce a reply.
    pub fn reply(&self, line: &str) -> SearchResult<SearchReply> {
        match self.run(line)? {
            CommandOutcome::Reply(reply) => Ok(reply),
            CommandOutcome::Fence(_) => panic!("unexpected fence for {}", line),
        }
    }

    /// Runs a command that must go live.
    pub fn fence(&self, line: &str) -> SearchResult<LiveFence> {
        match self.run(line)? {
            CommandOutcome::Fence(fence) => Ok(fence),
            CommandOutcome::Reply(_) => panic!("expected a fence for {}", line),
        }
    }
}

/// Builds an engine with three collections:
///
/// - `fleet`: points `p0`, `p1`, `p5` on the equator at longitudes 0, 1
///   and 5, each with a `speed` field
/// - `zones`: a unit square `square` and a polygon `triangle`
/// - `fruit`: string values
pub fn create_test_context() -> SearchResult<TestContext> {
    create_test_context_with(SearchConfig::default())
}

pub fn create_test_context_with(config: SearchConfig) -> SearchResult<TestContext> {
    let counters = Arc::new(ScriptCounters::default());
    let engine = SearchEngine::new(config).with_script_engine(Arc::new(TestScriptEngine {
        counters: counters.clone(),
    }));

    let fleet = MemoryCollection::new();
    fleet.set(Item::geometry("p0", Geometry::point(0.0, 0.0)).with_field("speed", 10.0));
    fleet.set(Item::geometry("p1", Geometry::point(1.0, 0.0)).with_field("speed", 50.0));
    fleet.set(Item::geometry("p5", Geometry::point(5.0, 0.0)).with_field("speed", 90.0));

    let zones = MemoryCollection::new();
    zones.set(Item::geometry("square", Geometry::rect(0.0, 0.0, 1.0, 1.0)));
    zones.set(Item::geometry(
        "triangle",
        geoquery::geometry::parse_geojson(
            r#"{"type":"Polygon","coordinates":[[[10,10],[12,10],[11,12],[10,10]]]}"#,
            true,
        )?,
    ));

    let fruit = MemoryCollection::new();
    for (id, value) in [
        ("f1", "apple"),
        ("f2", "apricot"),
        ("f3", "banana"),
        ("f4", "blueberry"),
        ("f5", "cherry"),
    ] {
        fruit.set(Item::string(id, value));
    }

    engine.set_collection("fleet", Arc::new(fleet.clone()));
    engine.set_collection("zones", Arc::new(zones));
    engine.set_collection("fruit", Arc::new(fruit.clone()));

    Ok(TestContext {
        engine,
        fleet,
        fruit,
        scripts: counters,
    })
}

/// Adds `count` random points inside the given lon/lat box to a collection.
pub fn scatter_points(
    collection: &MemoryCollection,
    prefix: &str,
    count: usize,
    (min_lon, min_lat, max_lon, max_lat): (f64, f64, f64, f64),
    seed: u64,
) {
    let mut rng = StdRng::seed_from_u64(seed);
    for i in 0..count {
        let lon = rng.random_range(min_lon..max_lon);
        let lat = rng.random_range(min_lat..max_lat);
        collection.set(Item::geometry(format!("{}{}", prefix, i), Geometry::point(lon, lat)));
    }
}

pub fn cleanup(_ctx: &TestContext) -> SearchResult<()> {
    Ok(())
}
