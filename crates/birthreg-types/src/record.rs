use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::codec;
use crate::error::CodecResult;

/// A full birth registration as stored on the ledger.
///
/// `record_id` is the logical identity of the record and is immutable once
/// created. `created_at` and `created_by` are stamped by the registry when the
/// record is first written; whatever a client sends for them is overwritten.
///
/// Fields this schema does not name are kept in `extra` (here and in every
/// section) and written back unchanged, so a rewrite never drops data put
/// there by another writer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BirthRecord {
    #[serde(rename = "recordID")]
    pub record_id: String,
    pub child: ChildInfo,
    pub parents: ParentInfo,
    pub contact: ContactInfo,
    pub medical: MedicalInfo,
    /// Unix seconds at creation.
    #[serde(rename = "createdAt")]
    pub created_at: u64,
    /// Membership identity of the organization that created the record.
    #[serde(rename = "createdBy")]
    pub created_by: String,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Unknown members of a stored object, carried through decode and encode.
pub type Extra = Map<String, Value>;

impl BirthRecord {
    /// Serialize to the stored byte form.
    pub fn encode(&self) -> CodecResult<Vec<u8>> {
        codec::encode(self)
    }

    /// Parse a record from its stored byte form.
    pub fn decode(bytes: &[u8]) -> CodecResult<Self> {
        codec::decode(bytes)
    }

    /// Stamp creation provenance. Any client-supplied values are replaced.
    pub fn stamp_provenance(&mut self, created_by: impl Into<String>, created_at: u64) {
        self.created_by = created_by.into();
        self.created_at = created_at;
    }

    /// Replace the medical section, leaving every other field untouched.
    pub fn replace_medical(&mut self, medical: MedicalInfo) {
        self.medical = medical;
    }
}

/// Newborn details.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChildInfo {
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub time_of_birth: String,
    pub gender: String,
    pub weight_grams: i64,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Mother and father details.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParentInfo {
    pub mother_first_name: String,
    pub mother_last_name: String,
    #[serde(rename = "motherID")]
    pub mother_id: String,
    pub father_first_name: String,
    pub father_last_name: String,
    #[serde(rename = "fatherID")]
    pub father_id: String,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Postal and contact details.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContactInfo {
    pub address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub phone_number: String,
    pub email: String,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Delivery details and clinical notes. The only section that can change
/// after creation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MedicalInfo {
    pub delivery_type: String,
    pub hospital_record_no: String,
    pub physician: String,
    pub medical_notes: String,
    #[serde(flatten)]
    pub extra: Extra,
}

impl MedicalInfo {
    pub fn decode(bytes: &[u8]) -> CodecResult<Self> {
        codec::decode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> BirthRecord {
        BirthRecord {
            record_id: "R1".into(),
            child: ChildInfo {
                first_name: "Alex".into(),
                last_name: "Morgan".into(),
                date_of_birth: "2024-03-01".into(),
                time_of_birth: "04:12".into(),
                gender: "F".into(),
                weight_grams: 3200,
                ..Default::default()
            },
            parents: ParentInfo {
                mother_first_name: "Sam".into(),
                mother_id: "M-77".into(),
                father_id: "F-12".into(),
                ..Default::default()
            },
            contact: ContactInfo {
                city: "Lagos".into(),
                postal_code: "100001".into(),
                ..Default::default()
            },
            medical: MedicalInfo {
                delivery_type: "Natural".into(),
                physician: "Dr. Obi".into(),
                ..Default::default()
            },
            created_at: 1_700_000_000,
            created_by: "Org1MSP".into(),
            extra: Extra::new(),
        }
    }

    #[test]
    fn field_names_match_stored_layout() {
        let value: serde_json::Value =
            serde_json::from_slice(&sample().encode().unwrap()).unwrap();
        assert_eq!(value["recordID"], "R1");
        assert_eq!(value["child"]["firstName"], "Alex");
        assert_eq!(value["child"]["weightGrams"], 3200);
        assert_eq!(value["parents"]["motherID"], "M-77");
        assert_eq!(value["parents"]["fatherID"], "F-12");
        assert_eq!(value["contact"]["postalCode"], "100001");
        assert_eq!(value["medical"]["deliveryType"], "Natural");
        assert_eq!(value["medical"]["hospitalRecordNo"], "");
        assert_eq!(value["createdAt"], 1_700_000_000u64);
        assert_eq!(value["createdBy"], "Org1MSP");
    }

    #[test]
    fn partial_input_fills_defaults() {
        let raw = json!({"recordID": "R1", "child": {"firstName": "Alex", "weightGrams": 3200}});
        let record = BirthRecord::decode(raw.to_string().as_bytes()).unwrap();
        assert_eq!(record.record_id, "R1");
        assert_eq!(record.child.first_name, "Alex");
        assert_eq!(record.child.weight_grams, 3200);
        assert_eq!(record.medical, MedicalInfo::default());
        assert_eq!(record.created_at, 0);
    }

    #[test]
    fn unknown_fields_survive_a_rewrite() {
        let raw = json!({
            "recordID": "R9",
            "registrar": "north",
            "child": {"firstName": "Alex", "nickname": "Al"},
            "parents": {"guardian": {"name": "Kim"}},
            "contact": {"fax": "none"},
            "medical": {"apgar": 9}
        });
        let record = BirthRecord::decode(raw.to_string().as_bytes()).unwrap();
        assert_eq!(record.record_id, "R9");
        assert_eq!(record.extra["registrar"], "north");
        assert_eq!(record.child.extra["nickname"], "Al");

        let written: serde_json::Value = serde_json::from_slice(&record.encode().unwrap()).unwrap();
        assert_eq!(written["registrar"], "north");
        assert_eq!(written["child"]["nickname"], "Al");
        assert_eq!(written["parents"]["guardian"]["name"], "Kim");
        assert_eq!(written["contact"]["fax"], "none");
        assert_eq!(written["medical"]["apgar"], 9);
    }

    #[test]
    fn replace_medical_keeps_unknown_fields_elsewhere() {
        let raw = json!({"recordID": "R9", "registrar": "north", "medical": {"apgar": 9}});
        let mut record = BirthRecord::decode(raw.to_string().as_bytes()).unwrap();
        record.replace_medical(MedicalInfo::decode(br#"{"deliveryType":"C-section"}"#).unwrap());
        assert_eq!(record.extra["registrar"], "north");
        assert!(record.medical.extra.is_empty());
    }

    #[test]
    fn stamp_overwrites_client_values() {
        let mut record = sample();
        record.stamp_provenance("Org2MSP", 42);
        assert_eq!(record.created_by, "Org2MSP");
        assert_eq!(record.created_at, 42);
    }

    #[test]
    fn replace_medical_keeps_other_sections() {
        let before = sample();
        let mut after = before.clone();
        after.replace_medical(MedicalInfo {
            delivery_type: "C-section".into(),
            ..Default::default()
        });
        assert_eq!(after.medical.delivery_type, "C-section");
        assert_eq!(after.child, before.child);
        assert_eq!(after.parents, before.parents);
        assert_eq!(after.contact, before.contact);
        assert_eq!(after.created_at, before.created_at);
        assert_eq!(after.created_by, before.created_by);
    }

    #[test]
    fn medical_decodes_partial_object() {
        let medical = MedicalInfo::decode(br#"{"deliveryType":"C-section"}"#).unwrap();
        assert_eq!(medical.delivery_type, "C-section");
        assert!(medical.physician.is_empty());
    }

    #[test]
    fn wrong_field_type_is_rejected() {
        assert!(BirthRecord::decode(br#"{"child":{"weightGrams":"heavy"}}"#).is_err());
        assert!(MedicalInfo::decode(b"[1,2,3]").is_err());
    }
}
