//! Общие значения для бенчмарков.

#![allow(dead_code)]

use rser::Value;

/// Объект, похожий на запись кеша линтера: вложенные массивы, строки,
/// разделяемый подобъект и самоссылка.
pub fn cache_entry(files: usize) -> Value {
    let shared_rules = Value::object([
        ("no-unused-vars", Value::from("error")),
        ("eqeqeq", Value::array(vec![Value::from("warn"), Value::from("smart")])),
    ]);

    let entries = (0..files)
        .map(|i| {
            Value::object([
                ("path", Value::from(format!("src/module_{i}.js"))),
                ("mtime", Value::date(1_700_000_000_000.0 + i as f64)),
                ("size", Value::Int(1024 + i as i64)),
                ("rules", shared_rules.clone()),
                ("hash", Value::Bytes(vec![i as u8; 32])),
            ])
        })
        .collect::<Vec<_>>();

    let root = Value::object([("version", Value::Int(3)), ("files", Value::array(entries))]);
    root.insert("self", root.clone());
    root
}

/// Длинная строка верхнего уровня.
pub fn long_string(len: usize) -> Value {
    Value::from("x".repeat(len))
}
