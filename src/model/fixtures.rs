// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Twinmapper and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Sample model and twin documents shared by unit tests, integration tests and benches.

#![doc(hidden)]

use serde_json::{json, Value};

pub const THERMOSTAT_MODEL: &str = "dtmi:example:Thermostat;1";
pub const ROOM_MODEL: &str = "dtmi:example:Room;1";
pub const FLOOR_MODEL: &str = "dtmi:example:Floor;1";
pub const BUILDING_MODEL: &str = "dtmi:example:Building;1";
pub const SENSOR_MODEL: &str = "dtmi:example:Sensor;1";

/// One interface with one string property.
pub fn single_interface_models() -> Value {
    json!([{
        "@type": "Interface",
        "@id": THERMOSTAT_MODEL,
        "displayName": "Thermostat",
        "contents": [
            {"@type": "Property", "name": "serialNumber", "schema": "string"}
        ]
    }])
}

/// Building -> Floor -> Room -> Thermostat, declared out of dependency order.
pub fn building_models() -> Value {
    json!([
        {
            "@type": "Interface",
            "@id": BUILDING_MODEL,
            "displayName": {"en": "Building"},
            "contents": [
                {"@type": "Property", "name": "address", "schema": "string"},
                {"@type": "Relationship", "name": "floors", "target": FLOOR_MODEL}
            ]
        },
        {
            "@type": "Interface",
            "@id": FLOOR_MODEL,
            "displayName": "Floor",
            "contents": [
                {"@type": "Property", "name": "level", "schema": "integer"},
                {"@type": "Relationship", "name": "rooms", "displayName": "Rooms", "target": ROOM_MODEL}
            ]
        },
        {
            "@type": "Interface",
            "@id": ROOM_MODEL,
            "displayName": "Room",
            "contents": [
                {"@type": ["Property", "Temperature"], "name": "temperature", "schema": "double"},
                {"@type": "Telemetry", "name": "occupancy", "schema": "integer"},
                {"@type": "Component", "name": "thermostat", "schema": THERMOSTAT_MODEL}
            ]
        },
        {
            "@type": "Interface",
            "@id": THERMOSTAT_MODEL,
            "displayName": "Thermostat",
            "contents": [
                {"@type": "Property", "name": "setPoint", "schema": "double"},
                {
                    "@type": "Property",
                    "name": "mode",
                    "schema": {
                        "@type": "Enum",
                        "valueSchema": "integer",
                        "enumValues": [
                            {"name": "off", "enumValue": 0},
                            {"name": "heat", "enumValue": 1},
                            {"name": "cool", "enumValue": 2}
                        ]
                    }
                },
                {
                    "@type": "Property",
                    "name": "calibration",
                    "schema": {
                        "@type": "Map",
                        "mapKey": {"name": "sensor", "schema": "string"},
                        "mapValue": {"name": "offset", "schema": "double"}
                    }
                },
                {
                    "@type": "Property",
                    "name": "schedule",
                    "schema": {
                        "@type": "Object",
                        "fields": [
                            {"name": "start", "schema": "time"},
                            {"name": "days", "schema": {"@type": "Array", "elementSchema": "string"}}
                        ]
                    }
                }
            ]
        }
    ])
}

/// Two thermostat twins.
pub fn thermostat_twins() -> Value {
    json!([
        {"$dtId": "thermostat-1", "$metadata": {"$model": THERMOSTAT_MODEL}, "name": "Lobby"},
        {"$dtId": "thermostat-2", "$metadata": {"$model": THERMOSTAT_MODEL}}
    ])
}

/// Twins across three models in query-result envelope form, one entry without `$dtId`.
pub fn building_twins() -> Value {
    json!({
        "value": [
            {"$dtId": "building-1", "$metadata": {"$model": BUILDING_MODEL}, "name": "HQ"},
            {
                "$dtId": "floor-1",
                "$metadata": {"$model": FLOOR_MODEL},
                "relationships": [{"$relationshipName": "floors", "$sourceId": "building-1"}]
            },
            {
                "$dtId": "room-1",
                "$metadata": {"$model": ROOM_MODEL},
                "relationships": [{"$relationshipName": "rooms", "$sourceId": "floor-1"}]
            },
            {
                "$dtId": "room-2",
                "$metadata": {"$model": ROOM_MODEL},
                "relationships": [{"$relationshipName": "rooms", "$sourceId": "floor-1"}]
            },
            {"$metadata": {"$model": ROOM_MODEL}, "name": "not a twin"}
        ]
    })
}

/// OPC-UA browse export: one root, a branching `Building` folder and a complex tag.
pub fn opcua_nodes() -> Value {
    json!({
        "Objects": {
            "Building": {
                "Room1": {
                    "tags": [
                        {"nodeId": "ns=2;s=Room1.SetPoint", "name": "SetPoint", "type": "Double"},
                        {"nodeId": "ns=2;s=Room1.Temperature", "name": "Temperature", "type": "Double"}
                    ]
                },
                "Room2": {
                    "tags": [{
                        "nodeId": "ns=2;s=Room2.Status",
                        "name": "Status",
                        "type": "complex",
                        "properties": [
                            {"name": "code", "type": "Int32"},
                            {"name": "detail", "type": "complex", "properties": [{"name": "text", "type": "String"}]}
                        ]
                    }]
                }
            }
        }
    })
}

/// `count` interfaces; every interface after the first embeds its predecessor as a component.
pub fn generated_models(count: usize, properties_per_interface: usize) -> Value {
    let interfaces = (0..count)
        .map(|idx| {
            let mut contents = (0..properties_per_interface)
                .map(|prop| json!({"@type": "Property", "name": format!("p{prop}"), "schema": "double"}))
                .collect::<Vec<_>>();
            if idx > 0 {
                contents.push(json!({
                    "@type": "Component",
                    "name": format!("inner{idx}"),
                    "schema": format!("dtmi:gen:I{};1", idx - 1)
                }));
            }
            json!({"@type": "Interface", "@id": format!("dtmi:gen:I{idx};1"), "contents": contents})
        })
        .collect::<Vec<_>>();
    Value::Array(interfaces)
}

pub fn generated_twins(models: usize, twins_per_model: usize) -> Value {
    let twins = (0..models)
        .flat_map(|model| {
            (0..twins_per_model).map(move |twin| {
                json!({
                    "$dtId": format!("twin-{model}-{twin}"),
                    "$metadata": {"$model": format!("dtmi:gen:M{model};1")}
                })
            })
        })
        .collect::<Vec<_>>();
    Value::Array(twins)
}
