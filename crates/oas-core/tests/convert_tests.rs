use oas_core::convert::{oas2_to_oas3, oas3_to_oas2, to_json, to_yaml};
use oas_core::parse::parameter::ParameterOrRef;
use oas_core::parse::request_body::RequestBodyOrRef;
use oas_core::parse::response::ResponseOrRef;
use oas_core::parse::security::SecuritySchemeType;
use oas_core::parse::{self, schema::SchemaType};
use oas_core::v2;
use oas_core::validate::validate_oas3;

const PETSTORE_V2: &str = include_str!("fixtures/petstore-v2.yaml");
const PETSTORE_V3: &str = include_str!("fixtures/petstore-v3.yaml");

fn swagger() -> v2::Swagger {
    parse::load_v2_from_data(PETSTORE_V2.as_bytes()).unwrap()
}

#[test]
fn v2_paths_and_servers_carry_base_path() {
    let spec = oas2_to_oas3(&swagger()).unwrap();
    assert_eq!(spec.openapi, "3.0.3");

    let paths: Vec<_> = spec.paths.keys().map(String::as_str).collect();
    assert_eq!(paths, ["/v1/pets", "/v1/pets/{petId}/photo"]);

    let servers: Vec<_> = spec.servers.iter().map(|s| s.url.as_str()).collect();
    assert_eq!(servers, ["/v1", "petstore.example.com", "https"]);
}

#[test]
fn v2_operations_convert() {
    let spec = oas2_to_oas3(&swagger()).unwrap();
    let pets = &spec.paths["/v1/pets"];

    let list = pets.get.as_ref().unwrap();
    assert!(matches!(
        &list.parameters[0],
        ParameterOrRef::Ref { ref_path } if ref_path == "#/components/parameters/limit"
    ));
    let ParameterOrRef::Parameter(tags) = &list.parameters[1] else {
        panic!("expected inline parameter");
    };
    assert_eq!(tags.style.as_deref(), Some("pipeDelimited"));
    assert_eq!(tags.explode, Some(false));

    let create = pets.post.as_ref().unwrap();
    let Some(RequestBodyOrRef::RequestBody(body)) = &create.request_body else {
        panic!("expected inline request body");
    };
    assert!(body.required);
    let schema = body.content["application/json"].schema.as_ref().unwrap();
    assert_eq!(schema.ref_path(), Some("#/components/schemas/Pet"));
    assert!(matches!(
        &create.responses["default"],
        ResponseOrRef::Ref { ref_path } if ref_path == "#/components/responses/Error"
    ));
}

#[test]
fn v2_form_data_becomes_multipart_body() {
    let spec = oas2_to_oas3(&swagger()).unwrap();
    let upload = spec.paths["/v1/pets/{petId}/photo"].post.as_ref().unwrap();
    assert_eq!(upload.parameters.len(), 1);

    let Some(RequestBodyOrRef::RequestBody(body)) = &upload.request_body else {
        panic!("expected inline request body");
    };
    let media: Vec<_> = body.content.keys().map(String::as_str).collect();
    assert_eq!(media, ["multipart/form-data"]);

    let schema = body.content["multipart/form-data"].schema.as_ref().unwrap();
    let file = schema.as_schema().unwrap().properties["file"].as_schema().unwrap();
    assert!(file.is_type(SchemaType::String));
    assert_eq!(file.format.as_deref(), Some("binary"));
}

#[test]
fn v2_components_convert() {
    let spec = oas2_to_oas3(&swagger()).unwrap();
    let components = spec.components.as_ref().unwrap();

    let pet = components.schemas["Pet"].as_schema().unwrap();
    assert_eq!(
        pet.properties["owner"].ref_path(),
        Some("#/components/schemas/Owner")
    );
    assert!(components.parameters.contains_key("limit"));
    assert!(components.responses.contains_key("Error"));

    let basic = &components.security_schemes["basic"];
    assert_eq!(basic.scheme_type, SecuritySchemeType::Http);
    assert_eq!(basic.scheme.as_deref(), Some("basic"));

    let oauth = &components.security_schemes["oauth"];
    let flows = oauth.flows.as_ref().unwrap();
    let credentials = flows.client_credentials.as_ref().unwrap();
    assert_eq!(
        credentials.token_url.as_deref(),
        Some("https://auth.example.com/token")
    );
}

#[test]
fn converted_v2_document_validates() {
    let spec = oas2_to_oas3(&swagger()).unwrap();
    validate_oas3(&spec).unwrap();
}

#[test]
fn v3_to_v2_splits_server_url() {
    let spec = parse::load_from_data(PETSTORE_V3.as_bytes()).unwrap();
    let swagger = oas3_to_oas2(&spec).unwrap();

    assert_eq!(swagger.swagger, "2.0");
    assert_eq!(swagger.host.as_deref(), Some("petstore.example.com"));
    assert_eq!(swagger.base_path.as_deref(), Some("/v1"));
    assert_eq!(swagger.schemes, ["https"]);
    assert!(swagger.definitions.contains_key("Pet"));
    assert!(swagger.security_definitions.contains_key("api_key"));

    let create = swagger.paths["/pets"].post.as_ref().unwrap();
    assert!(create.parameters.iter().any(|p| matches!(
        p,
        v2::ParameterOrRef::Ref { ref_path } if ref_path == "#/parameters/NewPet"
    )));
}

#[test]
fn v3_v2_v3_round_trip_keeps_paths_and_base_path() {
    let original = oas2_to_oas3(&swagger()).unwrap();
    let back = oas2_to_oas3(&oas3_to_oas2(&original).unwrap()).unwrap();

    let before: Vec<_> = original.paths.keys().collect();
    let after: Vec<_> = back.paths.keys().collect();
    assert_eq!(before, after);
    assert_eq!(back.servers.first().map(|s| s.url.as_str()), Some("/v1"));

    let swagger = oas3_to_oas2(&back).unwrap();
    let upload = swagger.paths["/pets/{petId}/photo"].post.as_ref().unwrap();
    let file = upload
        .parameters
        .iter()
        .find_map(|p| match p {
            v2::ParameterOrRef::Parameter(p) if p.name == "file" => Some(p),
            _ => None,
        })
        .unwrap();
    assert_eq!(file.location, v2::ParameterLocation::FormData);
    assert_eq!(file.param_type.as_deref(), Some("file"));
}

#[test]
fn marshaling_is_deterministic() {
    let spec = parse::load_from_data(PETSTORE_V3.as_bytes()).unwrap();
    assert_eq!(to_yaml(&spec).unwrap(), to_yaml(&spec).unwrap());
    assert_eq!(to_json(&spec).unwrap(), to_json(&spec).unwrap());

    let yaml = String::from_utf8(to_yaml(&spec).unwrap()).unwrap();
    let top: Vec<_> = yaml
        .lines()
        .filter(|l| !l.starts_with(' ') && !l.starts_with('-'))
        .map(|l| l.split(':').next().unwrap_or_default())
        .collect();
    assert_eq!(top, ["openapi", "info", "servers", "paths", "components"]);
}

#[test]
fn yaml_output_uses_fixed_field_order() {
    let doc = r#"
paths:
  /pets:
    get:
      responses:
        "200":
          description: ok
      operationId: listPets
info:
  version: "1.0"
  title: Pets
servers:
  - url: https://api.example.com/v1
openapi: 3.0.3
"#;
    let spec = parse::load_from_data(doc.as_bytes()).unwrap();
    let yaml = String::from_utf8(to_yaml(&spec).unwrap()).unwrap();
    insta::assert_snapshot!(yaml, @r"
    openapi: 3.0.3
    info:
      title: Pets
      version: '1.0'
    servers:
    - url: https://api.example.com/v1
    paths:
      /pets:
        get:
          operationId: listPets
          responses:
            '200':
              description: ok
    ");
}
