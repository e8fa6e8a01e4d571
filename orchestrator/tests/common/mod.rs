#![allow(dead_code)]

use std::{fs, path::Path};

use dataset::Catalog;
use serde_json::{Value, json};

pub fn catalog() -> Catalog {
    Catalog::from_json(
        r#"{
            "rooms": ["office", "hall", "bedroom", "kitchen"],
            "sensorOrder": ["s1", "s2"],
            "mqtt": { "host": "localhost" }
        }"#,
    )
    .unwrap()
}

/// A sample of `room` whose distances sit around a room specific value.
pub fn sample(room: &str, i: usize) -> Value {
    let base = match room {
        "hall" => 1.0,
        "kitchen" => 4.0,
        "office" => 7.0,
        _ => 9.5,
    };
    let jitter = (i % 7) as f64 / 10.0;

    json!({
        "time": i,
        "target": room,
        "vector": [base + jitter, 1, 10.0 - base - jitter, (i % 2) as f64],
    })
}

pub fn write_partition(dir: &Path, name: &str, samples: &[Value]) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join(name), serde_json::to_string_pretty(samples).unwrap()).unwrap();
}

/// `per_room` samples of every room in `rooms`, each followed by an exact duplicate.
pub fn rooms_with_duplicates(rooms: &[&str], per_room: usize) -> Vec<Value> {
    rooms
        .iter()
        .flat_map(|room| (0..per_room).map(move |i| sample(room, i)))
        .flat_map(|s| [s.clone(), s])
        .collect()
}
