//! 坐标归一化
//!
//! 历史前端把送货位置编码成三种互不兼容的形状：
//!
//! | 形状 | 示例 | 说明 |
//! |------|------|------|
//! | 数组 | `[-118.40, 33.88]` | GeoJSON 顺序：`[longitude, latitude]` |
//! | 全名对象 | `{"latitude": 33.88, "longitude": -118.40}` | 规范形状 |
//! | 缩写对象 | `{"lat": 33.88, "lon": -118.40}` | 旧版顾客端 |
//! | 其他 | `"lifeguard tower 3"` | 自由文本等，不可恢复 |
//!
//! [`normalize`] 是唯一的转换边界：所有入站位置数据在这里变成
//! [`Coordinate`]，之后的代码不再探测字段。无法恢复的输入退回
//! [`DEFAULT_COORDINATE`]，归一化永远不失败。

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fallback point used when no recoverable location exists: the lifeguard
/// tower at the main vendor stand. Every order stays renderable on the map.
pub const DEFAULT_COORDINATE: Coordinate = Coordinate {
    latitude: 33.881941,
    longitude: -118.409997,
};

/// 规范坐标 - 归一化后全系统使用的唯一表示
///
/// Invariant: both fields are always present as a pair. A `Coordinate` is
/// never built with one field missing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Build a coordinate from already-numeric parts, falling back to
    /// [`DEFAULT_COORDINATE`] when either value is not a finite number.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        if latitude.is_finite() && longitude.is_finite() {
            Self {
                latitude,
                longitude,
            }
        } else {
            DEFAULT_COORDINATE
        }
    }
}

/// 入站位置负载的显式变体
///
/// Legacy payloads are duck-typed; deserializing into this tagged union keeps
/// the shape probing in one place instead of scattered field checks.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawLocation {
    /// Ordered pair in GeoJSON order: `[longitude, latitude]`.
    /// 注意顺序与直觉相反，调用方不得自行解包。
    Pair(Vec<Value>),
    /// Object exposing `latitude`/`longitude` or the abbreviations
    /// `lat`/`lon`. Full names win when both are present.
    Named {
        latitude: Option<Value>,
        longitude: Option<Value>,
        lat: Option<Value>,
        lon: Option<Value>,
    },
    /// Anything else a client ever sent (free-text address, bare number,
    /// bool). Unrecoverable, so it normalizes to the fallback point, but
    /// it must not reject the order carrying it.
    Other(Value),
}

/// Coerce a JSON value to a finite f64.
///
/// Legacy clients sometimes send numeric strings; those coerce like the old
/// `Number()` call did. Anything else counts as absent.
fn coerce(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Pick the full-name field unless it is absent or an explicit JSON null,
/// in which case the abbreviation applies. Null-coalescing, not truthiness:
/// a non-coercible value like `"north"` does not fall through.
fn first_present<'a>(primary: &'a Option<Value>, fallback: &'a Option<Value>) -> Option<&'a Value> {
    primary
        .as_ref()
        .filter(|v| !v.is_null())
        .or_else(|| fallback.as_ref().filter(|v| !v.is_null()))
}

/// Normalize any raw location shape into a complete [`Coordinate`].
///
/// Pure and total: malformed input falls back to [`DEFAULT_COORDINATE`],
/// never an error. Idempotent over already-canonical input.
pub fn normalize(raw: Option<&RawLocation>) -> Coordinate {
    match raw {
        None => DEFAULT_COORDINATE,
        Some(RawLocation::Pair(values)) => {
            if values.len() < 2 {
                return DEFAULT_COORDINATE;
            }
            // GeoJSON order: index 0 is longitude, index 1 is latitude
            match (coerce(&values[1]), coerce(&values[0])) {
                (Some(latitude), Some(longitude)) => Coordinate {
                    latitude,
                    longitude,
                },
                _ => DEFAULT_COORDINATE,
            }
        }
        Some(RawLocation::Named {
            latitude,
            longitude,
            lat,
            lon,
        }) => {
            let latitude = first_present(latitude, lat).and_then(coerce);
            let longitude = first_present(longitude, lon).and_then(coerce);
            match (latitude, longitude) {
                (Some(latitude), Some(longitude)) => Coordinate {
                    latitude,
                    longitude,
                },
                _ => DEFAULT_COORDINATE,
            }
        }
        Some(RawLocation::Other(_)) => DEFAULT_COORDINATE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawLocation {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn normalizes_geojson_pair() {
        let coord = normalize(Some(&raw(json!([-118.40, 33.88]))));
        assert_eq!(coord.latitude, 33.88);
        assert_eq!(coord.longitude, -118.40);
    }

    #[test]
    fn normalizes_full_named_object() {
        let coord = normalize(Some(&raw(json!({
            "latitude": 33.9,
            "longitude": -118.41
        }))));
        assert_eq!(
            coord,
            Coordinate {
                latitude: 33.9,
                longitude: -118.41
            }
        );
    }

    #[test]
    fn normalizes_abbreviated_object() {
        let coord = normalize(Some(&raw(json!({ "lat": 33.9, "lon": -118.41 }))));
        assert_eq!(coord.latitude, 33.9);
        assert_eq!(coord.longitude, -118.41);
    }

    #[test]
    fn full_names_win_over_abbreviations() {
        let coord = normalize(Some(&raw(json!({
            "latitude": 1.0, "longitude": 2.0,
            "lat": 3.0, "lon": 4.0
        }))));
        assert_eq!(coord.latitude, 1.0);
        assert_eq!(coord.longitude, 2.0);
    }

    #[test]
    fn null_latitude_falls_through_to_abbreviation() {
        let coord = normalize(Some(&raw(json!({
            "latitude": null, "longitude": null,
            "lat": 33.9, "lon": -118.41
        }))));
        assert_eq!(coord.latitude, 33.9);
    }

    #[test]
    fn absent_location_maps_to_fallback_exactly() {
        assert_eq!(normalize(None), DEFAULT_COORDINATE);
        assert_eq!(normalize(None).latitude, 33.881941);
        assert_eq!(normalize(None).longitude, -118.409997);
    }

    #[test]
    fn short_pair_maps_to_fallback() {
        assert_eq!(normalize(Some(&raw(json!([-118.40])))), DEFAULT_COORDINATE);
    }

    #[test]
    fn numeric_strings_coerce() {
        let coord = normalize(Some(&raw(json!(["-118.40", "33.88"]))));
        assert_eq!(coord.latitude, 33.88);
        assert_eq!(coord.longitude, -118.40);
    }

    #[test]
    fn non_coercible_values_treated_as_absent() {
        assert_eq!(
            normalize(Some(&raw(json!({ "lat": "north", "lon": true })))),
            DEFAULT_COORDINATE
        );
        assert_eq!(
            normalize(Some(&raw(json!([[], {}])))),
            DEFAULT_COORDINATE
        );
    }

    #[test]
    fn scalar_shapes_accepted_and_map_to_fallback() {
        // free-text addresses and other scalars still parse as a location
        for value in [json!("lifeguard tower 3"), json!(42), json!(true)] {
            let parsed = raw(value);
            assert!(matches!(parsed, RawLocation::Other(_)));
            assert_eq!(normalize(Some(&parsed)), DEFAULT_COORDINATE);
        }
    }

    #[test]
    fn one_sided_object_maps_to_fallback() {
        // never one field without the other
        assert_eq!(
            normalize(Some(&raw(json!({ "latitude": 33.9 })))),
            DEFAULT_COORDINATE
        );
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize(Some(&raw(json!([-118.40, 33.88]))));
        let reparsed = raw(serde_json::to_value(once).unwrap());
        assert_eq!(normalize(Some(&reparsed)), once);

        let fallback_reparsed = raw(serde_json::to_value(DEFAULT_COORDINATE).unwrap());
        assert_eq!(normalize(Some(&fallback_reparsed)), DEFAULT_COORDINATE);
    }
}
