// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! End-to-end tests over `#[derive(Reflect)]` declarations.

use reflector::codec::{
    declare_boxed_vec, declare_vec, from_binary, from_text, from_text_str, register_common_types,
    to_binary, to_text, to_text_string, NamedValues, SingleValue,
};
use reflector::{Ref, RefMut, Reflect, Registry};
use serde_json::json;

#[derive(Reflect, Clone, Default, Debug, PartialEq)]
#[repr(C)]
struct Unit {
    score: i32,
    name: String,
}

#[derive(Reflect, Clone, Default, Debug, PartialEq)]
#[reflect(name = "Ship")]
#[repr(C)]
struct Spaceship {
    #[reflect(base)]
    unit: Unit,
    #[reflect(rename = "max_speed")]
    speed: f64,
    mode: Mode,
    #[reflect(skip)]
    cache: Vec<u8>,
}

#[derive(Reflect, Clone, Copy, Default, Debug, PartialEq)]
enum Mode {
    #[default]
    Docked,
    Cruise,
    #[reflect(rename = "warp")]
    Warp = 7,
}

#[derive(Reflect, Clone, Default, Debug, PartialEq)]
struct Percent {
    #[reflect(single_value)]
    value: u8,
}

#[derive(Reflect, Clone, Default, Debug, PartialEq)]
struct House {
    life: i32,
    size: f32,
}

#[derive(Reflect, Clone, Default, Debug, PartialEq)]
struct Street {
    houses: Vec<House>,
    owners: Vec<Box<String>>,
}

fn registry() -> Registry {
    let mut registry = Registry::new();
    register_common_types(&mut registry);
    registry.register::<Mode>();
    registry.register::<Spaceship>();
    registry.register::<Percent>();
    registry.register::<House>();
    declare_vec::<House>(&mut registry, "Vec<House>");
    declare_boxed_vec::<String>(&mut registry, "Vec<Box<String>>");
    registry.register::<Street>();
    registry
}

fn ship() -> Spaceship {
    Spaceship {
        unit: Unit {
            score: 101,
            name: "Nostromo".into(),
        },
        speed: 20.5,
        mode: Mode::Warp,
        cache: vec![1, 2, 3],
    }
}

#[test]
fn test_derived_struct_shape() {
    let registry = registry();
    let desc = registry.find_type("Ship").unwrap();
    let names: Vec<_> = desc.fields().iter().map(|f| f.name()).collect();
    assert_eq!(names, ["max_speed", "mode"]);
    assert_eq!(registry.get(desc.parent().unwrap()).name(), Some("Unit"));
    assert!(registry.find("Spaceship").is_none());
}

#[test]
fn test_derived_text_round_trip() {
    let registry = registry();
    let s = ship();
    let text = to_text(Ref::new(&registry, &s).unwrap()).unwrap();
    assert_eq!(
        text,
        json!({ "score": 101, "name": "Nostromo", "max_speed": 20.5, "mode": "warp" })
    );

    let mut back = Spaceship::default();
    from_text(&text, RefMut::new(&registry, &mut back).unwrap()).unwrap();
    assert_eq!(back.unit, s.unit);
    assert_eq!(back.speed, s.speed);
    assert_eq!(back.mode, Mode::Warp);
    assert!(back.cache.is_empty());
}

#[test]
fn test_derived_text_string_round_trip() {
    let registry = registry();
    let s = ship();
    let text = to_text_string(Ref::new(&registry, &s).unwrap()).unwrap();
    assert!(text.contains('\n'));

    let mut back = Spaceship::default();
    from_text_str(&text, RefMut::new(&registry, &mut back).unwrap()).unwrap();
    assert_eq!(back.speed, 20.5);
}

#[test]
fn test_derived_binary_skips_base() {
    let registry = registry();
    let s = ship();
    let bytes = to_binary(Ref::new(&registry, &s).unwrap()).unwrap();

    let mut back = Spaceship::default();
    from_binary(&bytes, RefMut::new(&registry, &mut back).unwrap()).unwrap();
    assert_eq!(back.speed, 20.5);
    assert_eq!(back.mode, Mode::Warp);
    assert_eq!(back.unit, Unit::default());
}

#[test]
fn test_enum_table_and_fallbacks() {
    let registry = registry();
    let table = registry
        .find_type("Mode")
        .unwrap()
        .props()
        .get::<NamedValues<Mode>>()
        .unwrap();
    assert_eq!(table.name_of(Mode::Warp), "warp");
    assert_eq!(table.value_of("Cruise"), Mode::Cruise);

    let mut m = Mode::Cruise;
    from_text(&json!("Hyperdrive"), RefMut::new(&registry, &mut m).unwrap()).unwrap();
    assert_eq!(m, Mode::Docked);
}

#[test]
fn test_unknown_integer_encodes_as_sentinel() {
    let mut registry = Registry::new();
    reflector::codec::declare_enum(
        &mut registry,
        "Level",
        NamedValues::new([(0i32, "low"), (1i32, "high")]),
    );
    let level = 5i32;
    let text = to_text(Ref::new(&registry, &level).unwrap()).unwrap();
    assert_eq!(text, json!("unknown"));
}

#[test]
fn test_single_value_attribute() {
    let registry = registry();
    let desc = registry.find_type("Percent").unwrap();
    assert!(desc.fields()[0].props().contains::<SingleValue>());

    let mut p = Percent::default();
    from_text(&json!(42), RefMut::new(&registry, &mut p).unwrap()).unwrap();
    assert_eq!(p.value, 42);
}

#[test]
fn test_collections_of_houses() {
    let registry = registry();
    let street = Street {
        houses: vec![
            House { life: 10, size: 20.0 },
            House { life: 11, size: 21.0 },
        ],
        owners: vec![Box::new("ann".into()), Box::new("bob".into())],
    };

    let text = to_text(Ref::new(&registry, &street).unwrap()).unwrap();
    assert_eq!(
        text["houses"],
        json!([{ "life": 10, "size": 20.0 }, { "life": 11, "size": 21.0 }])
    );
    let mut back = Street::default();
    from_text(&text, RefMut::new(&registry, &mut back).unwrap()).unwrap();
    assert_eq!(back, street);

    let bytes = to_binary(Ref::new(&registry, &street).unwrap()).unwrap();
    let mut back = Street {
        houses: vec![House::default(); 4],
        owners: vec![Box::new("stale".into())],
    };
    from_binary(&bytes, RefMut::new(&registry, &mut back).unwrap()).unwrap();
    assert_eq!(back, street);
}

#[test]
fn test_register_is_repeatable() {
    let mut registry = registry();
    let before = registry.find_type("Ship").unwrap().fields().len();
    registry.register::<Spaceship>();
    assert_eq!(registry.find_type("Ship").unwrap().fields().len(), before);
}

#[test]
fn test_global_registry() {
    {
        let mut registry = reflector::global().write();
        register_common_types(&mut registry);
        registry.register::<House>();
    }
    let registry = reflector::global().read();
    let h = House { life: 3, size: 1.5 };
    let text = to_text(Ref::new(&registry, &h).unwrap()).unwrap();
    assert_eq!(text, json!({ "life": 3, "size": 1.5 }));
}
