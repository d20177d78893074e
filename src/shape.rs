//! Turns one `node`/`way` element into the nested document we export.
//!
//! Attributes are bucketed into `created`, `pos` and flat fields; `tag`
//! descendants become flat fields or `address` entries (with street names and
//! postal codes cleaned on the way); `nd` descendants become `node_refs`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::postcode::update_zip_code;
use crate::reader::Element;
use crate::street::update_street_name;
use crate::tables::{AuditTables, CREATED_FIELDS};

/// `[latitude, longitude]`.
pub type Position = [Option<f64>; 2];

/// Names owned by the structured part of a [`Document`].
const RESERVED_FIELDS: [&str; 5] = ["type", "created", "pos", "address", "node_refs"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Node,
    Way,
}

impl ElementKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "node" => Some(Self::Node),
            "way" => Some(Self::Way),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "type")]
    pub kind: ElementKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_refs: Option<Vec<String>>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
}

impl Document {
    pub fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            created: None,
            pos: None,
            address: None,
            node_refs: None,
            fields: BTreeMap::new(),
        }
    }

    /// Last write wins. Names clashing with the structured fields are dropped.
    pub fn set_field(&mut self, key: String, value: String) {
        if RESERVED_FIELDS.contains(&key.as_str()) {
            debug!(key = %key, value = %value, "dropping field that shadows document structure");
            return;
        }
        self.fields.insert(key, value);
    }

    fn set_created(&mut self, key: &str, value: &str) {
        self.created
            .get_or_insert_with(BTreeMap::new)
            .insert(key.to_string(), value.to_string());
    }

    fn set_coordinate(&mut self, attribute: &str, value: &str) -> Result<()> {
        let index = if attribute == "lat" { 0 } else { 1 };
        let coordinate = value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|coordinate| coordinate.is_finite())
            .ok_or_else(|| Error::InvalidCoordinate {
                attribute: attribute.to_string(),
                value: value.to_string(),
            })?;
        self.pos.get_or_insert([None, None])[index] = Some(coordinate);
        Ok(())
    }

    fn set_address(&mut self, field: &str, value: String) {
        self.address
            .get_or_insert_with(BTreeMap::new)
            .insert(field.to_string(), value);
    }

    fn push_node_ref(&mut self, reference: &str) {
        self.node_refs
            .get_or_insert_with(Vec::new)
            .push(reference.to_string());
    }
}

/// `None` for anything that is not a `node` or `way`.
pub fn shape_element(element: &Element, tables: &AuditTables) -> Result<Option<Document>> {
    let Some(kind) = ElementKind::from_tag(&element.tag) else {
        return Ok(None);
    };
    let mut document = Document::new(kind);

    for (name, value) in &element.attrs {
        if CREATED_FIELDS.contains(&name.as_str()) {
            document.set_created(name, value);
        } else if name == "lat" || name == "lon" {
            document.set_coordinate(name, value)?;
        } else {
            document.set_field(name.clone(), value.clone());
        }
    }

    for child in element.descendants() {
        match child.tag.as_str() {
            "tag" => apply_tag(&mut document, child, tables)?,
            "nd" => document.push_node_ref(child.require_attr("ref")?),
            _ => {}
        }
    }

    Ok(Some(document))
}

fn apply_tag(document: &mut Document, tag: &Element, tables: &AuditTables) -> Result<()> {
    let key = tables.patterns.sanitize_key(tag.require_attr("k")?);
    let value = tag.require_attr("v")?;

    if !key.starts_with("addr") {
        document.set_field(key, value.to_string());
        return Ok(());
    }

    let segments: Vec<&str> = key.split(':').collect();
    match segments.as_slice() {
        ["addr", "street"] => document.set_address("street", update_street_name(value, tables)),
        ["addr", "postcode"] => document.set_address("postcode", update_zip_code(value, tables)),
        [_, field] => document.set_address(field, value.to_string()),
        // "addr", "address", ... carry no sub-field
        [_] => document.set_field(key.clone(), value.to_string()),
        _ => debug!(key = %key, "dropping nested address key"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tables() -> AuditTables {
        AuditTables::new().unwrap()
    }

    fn tag(k: &str, v: &str) -> Element {
        Element::new("tag").with_attr("k", k).with_attr("v", v)
    }

    fn shape(element: &Element) -> Document {
        shape_element(element, &tables()).unwrap().unwrap()
    }

    #[test]
    fn shapes_node_attributes_and_address() {
        let node = Element::new("node")
            .with_attr("id", "1")
            .with_attr("lat", "40.0")
            .with_attr("lon", "-76.3")
            .with_attr("version", "2")
            .with_attr("user", "alice")
            .with_child(tag("addr:city", "Lancaster"));

        let document = shape(&node);
        assert_eq!(
            serde_json::to_value(&document).unwrap(),
            json!({
                "type": "node",
                "pos": [40.0, -76.3],
                "created": {"version": "2", "user": "alice"},
                "address": {"city": "Lancaster"},
                "id": "1",
            })
        );
    }

    #[test]
    fn way_collects_node_refs_in_order() {
        let way = Element::new("way")
            .with_attr("id", "7")
            .with_child(Element::new("nd").with_attr("ref", "10"))
            .with_child(Element::new("nd").with_attr("ref", "20"))
            .with_child(tag("highway", "residential"));

        let document = shape(&way);
        assert_eq!(document.kind, ElementKind::Way);
        assert_eq!(
            document.node_refs,
            Some(vec!["10".to_string(), "20".to_string()])
        );
        assert_eq!(document.pos, None);
        assert_eq!(document.fields["highway"], "residential");
    }

    #[test]
    fn normalizes_street_and_postcode() {
        let node = Element::new("node")
            .with_child(tag("addr:street", "North Queen St"))
            .with_child(tag("addr:postcode", "17603-4321"));

        let address = shape(&node).address.unwrap();
        assert_eq!(address["street"], "North Queen Street");
        assert_eq!(address["postcode"], "17603");
    }

    #[test]
    fn drops_deep_address_keys() {
        let node = Element::new("node")
            .with_child(tag("addr:street:name", "Queen"))
            .with_child(tag("addr:housenumber", "12"));

        let document = shape(&node);
        assert_eq!(document.address.unwrap().len(), 1);
        assert!(document.fields.is_empty());
    }

    #[test]
    fn sanitizes_keys_and_keeps_last_value() {
        let node = Element::new("node")
            .with_child(tag("name.en", "First"))
            .with_child(tag("name en", "Second"))
            .with_child(tag("tiger:county", "Lancaster, PA"));

        let document = shape(&node);
        assert_eq!(document.fields["name_en"], "Second");
        assert_eq!(document.fields["tiger:county"], "Lancaster, PA");
        assert_eq!(document.address, None);
    }

    #[test]
    fn address_key_without_sub_field_is_flat() {
        let node = Element::new("node").with_child(tag("addressing", "yes"));
        let document = shape(&node);
        assert_eq!(document.fields["addressing"], "yes");
        assert_eq!(document.address, None);
    }

    #[test]
    fn reserved_names_do_not_shadow_structure() {
        let way = Element::new("way")
            .with_child(tag("type", "multipolygon"))
            .with_child(tag("created", "yesterday"))
            .with_child(tag("node_refs", "1;2"));
        let document = shape(&way);
        assert_eq!(document.kind, ElementKind::Way);
        assert_eq!(document.created, None);
        assert_eq!(document.node_refs, None);
        assert!(document.fields.is_empty());
    }

    #[test]
    fn other_elements_are_skipped() {
        let relation = Element::new("relation").with_child(tag("type", "route"));
        assert_eq!(shape_element(&relation, &tables()).unwrap(), None);
        assert_eq!(shape_element(&tag("name", "x"), &tables()).unwrap(), None);
    }

    #[test]
    fn malformed_children_are_fatal() {
        let tables = tables();
        let missing_value =
            Element::new("node").with_child(Element::new("tag").with_attr("k", "name"));
        assert!(matches!(
            shape_element(&missing_value, &tables),
            Err(Error::MissingAttribute { attribute: "v", .. })
        ));

        let missing_ref = Element::new("way").with_child(Element::new("nd"));
        assert!(shape_element(&missing_ref, &tables).is_err());

        let bad_lat = Element::new("node").with_attr("lat", "north");
        assert!(matches!(
            shape_element(&bad_lat, &tables),
            Err(Error::InvalidCoordinate { .. })
        ));

        let nan_lat = Element::new("node")
            .with_attr("lat", "nan")
            .with_attr("lon", "-76.3");
        assert!(matches!(
            shape_element(&nan_lat, &tables),
            Err(Error::InvalidCoordinate { ref attribute, .. }) if attribute == "lat"
        ));

        let infinite_lon = Element::new("node")
            .with_attr("lat", "40.0")
            .with_attr("lon", "inf");
        assert!(matches!(
            shape_element(&infinite_lon, &tables),
            Err(Error::InvalidCoordinate { ref attribute, .. }) if attribute == "lon"
        ));
    }

    #[test]
    fn documents_round_trip_through_json() {
        let node = Element::new("node")
            .with_attr("id", "42")
            .with_attr("lat", "39.9050")
            .with_attr("lon", "-76.5699")
            .with_attr("changeset", "99")
            .with_attr("timestamp", "2014-01-01T00:00:00Z")
            .with_child(tag("addr:street", "Main St"))
            .with_child(tag("amenity", "cafe"));
        let way = Element::new("way")
            .with_attr("id", "43")
            .with_child(Element::new("nd").with_attr("ref", "42"));

        for element in [node, way] {
            let document = shape(&element);
            let line = serde_json::to_string(&document).unwrap();
            let parsed: Document = serde_json::from_str(&line).unwrap();
            assert_eq!(parsed, document);
        }
    }
}
