//! Staff members, keyed by external ID and attached to an office

use fincfg_docs::{DeclaredEntity, FieldSpec, FieldType};
use serde_json::json;

use super::{DriftField, KeyField, KindConfig};
use crate::mapper::{DATE_FORMAT, LOCALE, MapContext, MappingError, Payload, SpecReader};

const FIELDS: &[FieldSpec] = &[
    FieldSpec::required("externalId", FieldType::Text).aliases(&["employeeId"]),
    FieldSpec::required("firstName", FieldType::Text).aliases(&["firstname"]),
    FieldSpec::required("lastName", FieldType::Text).aliases(&["lastname"]),
    FieldSpec::required("officeId", FieldType::Text).aliases(&["office", "officeName"]),
    FieldSpec::optional("isLoanOfficer", FieldType::Bool).aliases(&["loanOfficer"]),
    FieldSpec::optional("isActive", FieldType::Bool).aliases(&["active"]),
    FieldSpec::optional("mobileNo", FieldType::Text).aliases(&["mobileNumber", "phone"]),
    FieldSpec::optional("joiningDate", FieldType::Date),
];

pub const STAFF: KindConfig = KindConfig {
    kind: "Staff",
    directory: "staff",
    endpoint: "staff",
    identity: KeyField::new("externalId", "externalId"),
    fallback_keys: &[],
    reference_fields: &["externalId", "displayName"],
    declared_references: &[],
    fields: FIELDS,
    to_payload,
    parent_field: None,
    remote_paths: &[],
    write_only: &[],
    drift_fields: &[
        DriftField::plain("firstName", "firstname"),
        DriftField::plain("lastName", "lastname"),
        DriftField::plain("isLoanOfficer", "isLoanOfficer"),
        DriftField::plain("isActive", "isActive"),
        DriftField::plain("mobileNo", "mobileNo"),
    ],
};

fn to_payload(entity: &DeclaredEntity, ctx: &mut MapContext<'_>) -> Result<Payload, MappingError> {
    let spec = SpecReader::new(entity);
    let mut payload = Payload::new();

    payload.insert("externalId".into(), json!(spec.required_text("externalId")?));
    payload.insert("firstname".into(), json!(spec.required_text("firstName")?));
    payload.insert("lastname".into(), json!(spec.required_text("lastName")?));

    let office = spec.required_text("officeId")?;
    payload.insert(
        "officeId".into(),
        json!(ctx.reference("officeId", "Office", &office)?),
    );

    payload.insert(
        "isLoanOfficer".into(),
        json!(spec.flag("isLoanOfficer")?.unwrap_or(false)),
    );
    payload.insert("isActive".into(), json!(spec.flag("isActive")?.unwrap_or(true)));
    if let Some(mobile) = spec.text("mobileNo") {
        payload.insert("mobileNo".into(), json!(mobile));
    }
    if let Some(joined) = spec.date("joiningDate")? {
        payload.insert("joiningDate".into(), json!(joined));
    }
    payload.insert("dateFormat".into(), json!(DATE_FORMAT));
    payload.insert("locale".into(), json!(LOCALE));

    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::DeclaredIndex;
    use crate::mapper::{ResolveReference, Resolution};

    struct Offices;

    impl ResolveReference for Offices {
        fn resolve(&mut self, kind: &str, key: &str) -> fincfg_transport::Result<Resolution> {
            assert_eq!(kind, "Office");
            Ok(match key {
                "Nairobi Branch" => Resolution::Found(2),
                _ => Resolution::Unresolved,
            })
        }
    }

    #[test]
    fn test_staff_payload_resolves_office_by_document_name() {
        let mut index = DeclaredIndex::default();
        index.insert("Office", "Nairobi Branch", "nairobi");

        let entity = DeclaredEntity::new(
            "Staff",
            "jane-doe",
            json!({
                "externalId": "EMP-001",
                "firstName": "Jane",
                "lastName": "Doe",
                "officeId": "nairobi",
                "isLoanOfficer": true,
                "joiningDate": "2023-03-15"
            }),
        );
        let mut resolver = Offices;
        let payload = to_payload(&entity, &mut MapContext::new(&mut resolver, &index)).unwrap();

        assert_eq!(payload["officeId"], json!(2));
        assert_eq!(payload["firstname"], json!("Jane"));
        assert_eq!(payload["isLoanOfficer"], json!(true));
        assert_eq!(payload["isActive"], json!(true));
        assert_eq!(payload["joiningDate"], json!("15 March 2023"));
    }
}
