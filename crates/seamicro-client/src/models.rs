//! Typed views over resource attributes.
//!
//! The chassis returns loosely shaped objects, so every record keeps the
//! fields it does not name in `extra`. Use [`seamicro_core::Resource::record`]
//! to decode one:
//!
//! ```
//! use seamicro_client::models::PoolRecord;
//! use serde_json::json;
//!
//! let record: PoolRecord =
//!     serde_json::from_value(json!({"id": "0/p0", "freeSize": 400, "raidLevel": 0})).unwrap();
//! assert_eq!(record.free_size, Some(400));
//! assert!(record.extra.contains_key("raidLevel"));
//! ```

use seamicro_core::ResourceId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A compute server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerRecord {
    /// Server identifier, e.g. `0/0`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ResourceId>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Whether the server is powered on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    /// Operational status reported by the chassis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Fields not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A storage pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolRecord {
    /// Pool identifier, `<slot>/<name>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ResourceId>,
    /// Unallocated capacity in GB.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_size: Option<u64>,
    /// Allocated capacity in GB.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_size: Option<u64>,
    /// Remaining fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A volume carved from a pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeRecord {
    /// Volume identifier, `<slot>/<pool>/<name>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ResourceId>,
    /// Provisioned size in GB.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_size: Option<u64>,
    /// Remaining fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A physical disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskRecord {
    /// Disk identifier, `<slot>/<bay>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ResourceId>,
    /// Raw capacity in GB.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Pool membership, when assigned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool: Option<String>,
    /// Remaining fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A network interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceRecord {
    /// Interface identifier, e.g. `0/0`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ResourceId>,
    /// Administrative shutdown flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shutdown: Option<bool>,
    /// Tagged VLAN ids.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tagged_vlans: Vec<Value>,
    /// Untagged VLAN ids.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub untagged_vlans: Vec<Value>,
    /// Remaining fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Chassis-wide properties from `/chassis`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChassisRecord {
    /// Identifier, when the listing keyed the chassis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ResourceId>,
    /// Chassis serial number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    /// Hardware model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Remaining fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// System properties from `/chassis/systems`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemRecord {
    /// Identifier, when the listing keyed the system.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ResourceId>,
    /// Configured host name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    /// Running software release.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub software_version: Option<String>,
    /// Remaining fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Any chassis part without a dedicated record (fan trays, power supplies,
/// management and storage cards).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentRecord {
    /// Component identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ResourceId>,
    /// Operational state, e.g. `up`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operational_state: Option<String>,
    /// Remaining fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn interface_record_reads_vlan_lists() {
        let record: InterfaceRecord = serde_json::from_value(json!({
            "id": "0/0",
            "shutdown": false,
            "taggedVlans": [10, 20],
            "speed": 10000
        }))
        .unwrap();
        assert_eq!(record.id, Some(ResourceId::from("0/0")));
        assert_eq!(record.tagged_vlans, vec![json!(10), json!(20)]);
        assert!(record.untagged_vlans.is_empty());
        assert_eq!(record.extra.get("speed"), Some(&json!(10000)));
    }

    #[test]
    fn integer_ids_decode() {
        let record: ServerRecord =
            serde_json::from_value(json!({"id": 1234, "name": "sample-server"})).unwrap();
        assert_eq!(record.id, Some(ResourceId::Int(1234)));
        assert_eq!(record.name.as_deref(), Some("sample-server"));
    }

    #[test]
    fn unknown_fields_survive_serialization() {
        let record: ComponentRecord =
            serde_json::from_value(json!({"id": 1, "rpm": 4200})).unwrap();
        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back, json!({"id": 1, "rpm": 4200}));
    }
}
