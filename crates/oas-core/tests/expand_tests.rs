use oas_core::error::{ExpandError, ResolveError};
use oas_core::expand::{self, has_references};
use oas_core::parse::response::ResponseOrRef;
use oas_core::parse::schema::{Schema, SchemaOrRef, SchemaType};
use oas_core::parse::spec::OpenApiSpec;
use oas_core::parse::{self, request_body::RequestBodyOrRef};

const PETSTORE_V3: &str = include_str!("fixtures/petstore-v3.yaml");
const REFERENCES: &str = include_str!("fixtures/references.yaml");

fn load(yaml: &str) -> OpenApiSpec {
    parse::load_from_data(yaml.as_bytes()).unwrap()
}

fn response_schema<'s>(spec: &'s OpenApiSpec, path: &str, code: &str) -> &'s SchemaOrRef {
    let op = spec.paths[path].get.as_ref().unwrap();
    match &op.responses[code] {
        ResponseOrRef::Response(r) => r.content["application/json"].schema.as_ref().unwrap(),
        ResponseOrRef::Ref { ref_path } => panic!("response still references {ref_path}"),
    }
}

fn component(spec: &OpenApiSpec, name: &str) -> Schema {
    let node = &spec.components.as_ref().unwrap().schemas[name];
    node.as_schema().expect("component should be inline").clone()
}

#[test]
fn reference_chain_resolves_to_final_target() {
    let mut spec = load(REFERENCES);
    expand::expand_paths(&mut spec).unwrap();

    let schema = response_schema(&spec, "/chain", "200").as_schema().unwrap();
    assert!(schema.is_type(SchemaType::Object));
    assert!(schema.properties.contains_key("value"));
}

#[test]
fn expand_schema_ref_single_node() {
    let mut spec = load(REFERENCES);
    let mut node = SchemaOrRef::reference("#/components/schemas/A");
    expand::expand_schema_ref(&mut node, &mut spec).unwrap();
    assert!(!has_references(&node));
    assert!(node.as_schema().unwrap().properties.contains_key("value"));
}

#[test]
fn recursive_schema_is_cut_one_level_down() {
    let mut spec = load(REFERENCES);
    expand::expand_paths(&mut spec).unwrap();

    let node = response_schema(&spec, "/tree", "200");
    assert!(!has_references(node));

    let children = node.as_schema().unwrap().properties["children"].as_schema().unwrap();
    let child = children.items.as_deref().unwrap().as_schema().unwrap();
    assert!(child.properties.contains_key("label"));
    let grandchild = child.properties["children"].as_schema().unwrap();
    assert_eq!(
        grandchild.items.as_deref().and_then(SchemaOrRef::as_schema),
        Some(&Schema::default())
    );
}

#[test]
fn mutual_merge_cycle_terminates() {
    let mut spec = load(REFERENCES);
    expand::expand_components(&mut spec).unwrap();

    let left = component(&spec, "Left");
    let right = component(&spec, "Right");
    let left_props: Vec<_> = left.properties.keys().map(String::as_str).collect();
    let right_props: Vec<_> = right.properties.keys().map(String::as_str).collect();
    assert_eq!(left_props, ["left", "owner", "right"]);
    assert_eq!(right_props, ["right", "left", "owner"]);
    assert!(left.extensions.is_empty());
    assert!(right.extensions.is_empty());

    // References outside the cycle are expanded on both sides.
    for schema in [&left, &right] {
        let owner = schema.properties["owner"].as_schema().unwrap();
        let names: Vec<_> = owner.properties.keys().map(String::as_str).collect();
        assert_eq!(names, ["name", "email"]);
        assert_eq!(owner.required, ["name"]);
    }
}

#[test]
fn merge_cycle_keeps_expanded_properties_through_paths() {
    let mut spec = load(REFERENCES);
    expand::expand_paths(&mut spec).unwrap();

    let left = response_schema(&spec, "/left", "200");
    assert!(!has_references(left));
    let owner = left.as_schema().unwrap().properties["owner"].as_schema().unwrap();
    assert!(owner.properties.contains_key("name"));
    assert!(owner.properties.contains_key("email"));
}

#[test]
fn expanding_twice_changes_nothing() {
    for source in [PETSTORE_V3, REFERENCES] {
        let mut spec = load(source);
        expand::expand_paths(&mut spec).unwrap();
        expand::expand_components(&mut spec).unwrap();
        let once = serde_json::to_string(&spec).unwrap();

        expand::expand_paths(&mut spec).unwrap();
        expand::expand_components(&mut spec).unwrap();
        let twice = serde_json::to_string(&spec).unwrap();

        assert_eq!(once, twice);
    }
}

#[test]
fn merge_extension_combines_properties_and_required() {
    let mut spec = load(PETSTORE_V3);
    expand::expand_components(&mut spec).unwrap();

    let pet = component(&spec, "Pet");
    let props: Vec<_> = pet.properties.keys().map(String::as_str).collect();
    assert_eq!(props, ["id", "name", "tag"]);
    assert_eq!(pet.required, ["id", "name"]);
    assert!(!pet.extensions.contains_key("x-pet-merge"));
}

#[test]
fn expand_paths_leaves_no_references() {
    let mut spec = load(PETSTORE_V3);
    expand::expand_paths(&mut spec).unwrap();

    for (path, item) in &spec.paths {
        for (method, op) in item.operations() {
            for param in &op.parameters {
                let json = serde_json::to_string(param).unwrap();
                assert!(!json.contains("$ref"), "{method} {path}: {json}");
            }
            if let Some(body) = &op.request_body {
                let RequestBodyOrRef::RequestBody(body) = body else {
                    panic!("{method} {path}: request body still a reference");
                };
                for media in body.content.values() {
                    assert!(!has_references(media.schema.as_ref().unwrap()));
                }
            }
            for (code, resp) in &op.responses {
                let ResponseOrRef::Response(resp) = resp else {
                    panic!("{method} {path} {code}: response still a reference");
                };
                for media in resp.content.values() {
                    assert!(!has_references(media.schema.as_ref().unwrap()));
                }
            }
        }
    }

    // The merged Pet reached through /pets/{petId} carries the merged fields.
    let pet = response_schema(&spec, "/pets/{petId}", "200").as_schema().unwrap();
    assert!(pet.properties.contains_key("name"));
}

#[test]
fn missing_target_names_the_operation() {
    let mut spec = load(&REFERENCES.replace(
        "$ref: '#/components/schemas/C'",
        "$ref: '#/components/schemas/Missing'",
    ));
    let err = expand::expand_paths(&mut spec).unwrap_err();
    match err {
        ExpandError::Operation {
            path,
            method,
            source: ResolveError::RefTargetNotFound(target),
        } => {
            assert_eq!(path, "/chain");
            assert_eq!(method, "GET");
            assert_eq!(target, "#/components/schemas/Missing");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn malformed_merge_list_is_rejected() {
    let mut spec = load(&PETSTORE_V3.replace(
        "      x-pet-merge:\n        - $ref: '#/components/schemas/NewPet'\n",
        "      x-pet-merge: '#/components/schemas/NewPet'\n",
    ));
    let err = expand::expand_components(&mut spec).unwrap_err();
    assert!(matches!(
        err,
        ExpandError::Component {
            source: ResolveError::InvalidMergeRef { .. },
            ..
        }
    ));
}
