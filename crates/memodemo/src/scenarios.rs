//! Demonstration scenarios

use std::convert::Infallible;
use std::fmt::Display;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use memocache::{
    CacheConfig, CacheKey, CallArgs, Memoized, MemoizedFn, Param, Signature, StatsSnapshot, Value,
};
use serde::Serialize;
use tracing::info;

use crate::Scenario;

/// Simulated cost of `expensive_computation`
const EXPENSIVE_DELAY: Duration = Duration::from_millis(100);

/// Outcome of one scenario
#[derive(Debug, Serialize)]
pub struct Report {
    pub scenario: String,
    pub calls: Vec<String>,
    pub stats: StatsSnapshot,
}

pub struct ScenarioRunner {
    config: CacheConfig,
}

impl ScenarioRunner {
    pub fn new(config: CacheConfig) -> Self {
        Self { config }
    }

    pub fn run(&self, scenario: Scenario) -> Result<Vec<Report>> {
        match scenario {
            Scenario::Square => Ok(vec![self.square()]),
            Scenario::Add => Ok(vec![self.add()?]),
            Scenario::Fibonacci => Ok(vec![self.fibonacci()]),
            Scenario::Expensive => Ok(vec![self.expensive()?]),
            Scenario::All => Ok(vec![
                self.square(),
                self.add()?,
                self.fibonacci(),
                self.expensive()?,
            ]),
        }
    }

    fn config(&self, name: &str) -> CacheConfig {
        CacheConfig {
            name: name.to_string(),
            ..self.config.clone()
        }
    }

    fn square(&self) -> Report {
        let square = Memoized::new(self.config("square"), |x: &i64| Ok::<_, Infallible>(x * x));
        let mut calls = Vec::new();

        for x in [2, 2, 3, 4, 2] {
            let hits = square.stats().hits;
            let result = square.call(&x).unwrap_or_else(|never| match never {});
            calls.push(describe(format!("square({})", x), result, square.stats().hits > hits));
        }

        Report {
            scenario: "square".to_string(),
            calls,
            stats: square.stats(),
        }
    }

    fn add(&self) -> Result<Report> {
        let sig = Signature::new("add", [Param::required("a"), Param::with_default("b", 10)])?;
        let add = MemoizedFn::new(sig, self.config.capacity, |args: &CacheKey| {
            let a = args.get("a").and_then(Value::as_int).unwrap_or(0);
            let b = args.get("b").and_then(Value::as_int).unwrap_or(0);
            Ok::<_, Infallible>(a + b)
        });
        let mut calls = Vec::new();

        let variants = [
            ("add(5)", CallArgs::new().arg(5)),
            ("add(5, b=10)", CallArgs::new().arg(5).kwarg("b", 10)),
            ("add(a=5, b=10)", CallArgs::new().kwarg("a", 5).kwarg("b", 10)),
            ("add(7)", CallArgs::new().arg(7)),
        ];
        for (label, args) in variants {
            let hits = add.stats().hits;
            let result = add.call(&args)?;
            calls.push(describe(label, result, add.stats().hits > hits));
        }

        Ok(Report {
            scenario: "add".to_string(),
            calls,
            stats: add.stats(),
        })
    }

    fn fibonacci(&self) -> Report {
        let fib: Memoized<u64, u64, Infallible> =
            Memoized::recursive(self.config("fibonacci"), |fib, n| {
                if *n <= 1 {
                    return Ok(*n);
                }
                Ok(fib(&(n - 1))? + fib(&(n - 2))?)
            });
        let mut calls = Vec::new();

        let value = fib.call(&10).unwrap_or_else(|never| match never {});
        calls.push(format!("fibonacci(10) = {}", value));
        info!(stats = %fib.stats(), "fibonacci(10) computed");

        for n in 0..15 {
            let value = fib.call(&n).unwrap_or_else(|never| match never {});
            calls.push(format!("fibonacci({}) = {}", n, value));
        }

        Report {
            scenario: "fibonacci".to_string(),
            calls,
            stats: fib.stats(),
        }
    }

    fn expensive(&self) -> Result<Report> {
        let sig = Signature::new(
            "expensive_computation",
            [
                Param::required("x"),
                Param::required("y"),
                Param::with_default("operation", "add"),
            ],
        )?;
        let compute = MemoizedFn::new(sig, self.config.capacity, |args: &CacheKey| {
            thread::sleep(EXPENSIVE_DELAY);
            Ok::<_, Infallible>(expensive_computation(args))
        });
        let mut calls = Vec::new();

        let variants = [
            ("(5, 3, operation=\"add\")", CallArgs::new().arg(5).arg(3).kwarg("operation", "add")),
            ("(5, 3, operation=\"add\")", CallArgs::new().arg(5).arg(3).kwarg("operation", "add")),
            (
                "(10, 2, operation=\"multiply\")",
                CallArgs::new().arg(10).arg(2).kwarg("operation", "multiply"),
            ),
            (
                "(x=5, y=3, operation=\"add\")",
                CallArgs::new().kwarg("x", 5).kwarg("y", 3).kwarg("operation", "add"),
            ),
        ];
        for (label, args) in variants {
            let hits = compute.stats().hits;
            let started = Instant::now();
            let result = compute.call(&args)?;
            calls.push(format!(
                "{} in {:?}",
                describe(format!("expensive_computation{}", label), result, compute.stats().hits > hits),
                started.elapsed()
            ));
        }

        let stats = compute.stats();
        compute.clear();
        calls.push(format!("after clear: {}", compute.stats()));

        Ok(Report {
            scenario: "expensive".to_string(),
            calls,
            stats,
        })
    }
}

fn expensive_computation(args: &CacheKey) -> Value {
    let x = args.get("x").and_then(Value::as_int);
    let y = args.get("y").and_then(Value::as_int);
    let (Some(x), Some(y)) = (x, y) else {
        return Value::None;
    };
    match args.get("operation").and_then(Value::as_str) {
        Some("add") => Value::Int(x + y),
        Some("multiply") => Value::Int(x * y),
        Some("power") => u32::try_from(y)
            .ok()
            .and_then(|y| x.checked_pow(y))
            .map_or(Value::None, Value::Int),
        _ => Value::None,
    }
}

fn describe(call: impl Display, result: impl Display, hit: bool) -> String {
    format!("{} = {} [{}]", call, result, if hit { "hit" } else { "miss" })
}
