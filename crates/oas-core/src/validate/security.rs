use super::{Located, Result, Validator};
use crate::error::ValidationError;
use crate::parse::security::{SecurityRequirement, SecurityScheme, SecuritySchemeType};

impl Validator<'_> {
    /// Every requirement must name a scheme declared in components.
    pub(super) fn validate_security_requirements(&self, requirements: &[SecurityRequirement]) -> Result {
        for (i, requirement) in requirements.iter().enumerate() {
            for name in requirement.keys() {
                let defined = self
                    .components
                    .is_some_and(|c| c.security_schemes.contains_key(name));
                if !defined {
                    return Err(ValidationError::at(
                        name.as_str(),
                        format!("security scheme {name:?} is not defined"),
                    )
                    .within(i.to_string()));
                }
            }
        }
        Ok(())
    }
}

pub(super) fn validate_security_scheme(scheme: &SecurityScheme) -> Result {
    let kind = scheme.scheme_type;
    let forbidden = |field: &str| {
        Err(ValidationError::at(
            field,
            format!("security scheme of type {:?} can't have {field:?}", kind.as_str()),
        ))
    };

    if kind == SecuritySchemeType::ApiKey {
        if scheme.location.is_none() {
            return Err(ValidationError::at(
                "in",
                "security scheme of type \"apiKey\" should have \"in\" (query, header or cookie)",
            ));
        }
        if scheme.name.as_deref().is_none_or(str::is_empty) {
            return Err(ValidationError::at(
                "name",
                "security scheme of type \"apiKey\" should have \"name\"",
            ));
        }
    } else {
        if scheme.location.is_some() {
            return forbidden("in");
        }
        if scheme.name.is_some() {
            return forbidden("name");
        }
    }

    if kind == SecuritySchemeType::Http {
        match scheme.scheme.as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("bearer") => {}
            Some("basic") => {
                if scheme.bearer_format.is_some() {
                    return Err(ValidationError::at(
                        "bearerFormat",
                        "security scheme with scheme \"basic\" can't have \"bearerFormat\"",
                    ));
                }
            }
            Some(other) => {
                return Err(ValidationError::at(
                    "scheme",
                    format!("security scheme of type \"http\" has invalid scheme {other:?}"),
                ));
            }
            None => {
                return Err(ValidationError::at(
                    "scheme",
                    "security scheme of type \"http\" should have \"scheme\"",
                ));
            }
        }
    } else if scheme.bearer_format.is_some() {
        return forbidden("bearerFormat");
    }

    match (kind, &scheme.flows) {
        (SecuritySchemeType::OAuth2, None) => {
            return Err(ValidationError::at(
                "flows",
                "security scheme of type \"oauth2\" should have \"flows\"",
            ));
        }
        (SecuritySchemeType::OAuth2, Some(flows)) => {
            let mut any = false;
            for (flow_kind, flow) in flows.iter() {
                any = true;
                let field = if flow_kind.needs_authorization_url()
                    && flow.authorization_url.as_deref().is_none_or(str::is_empty)
                {
                    Some(("authorizationUrl", "an authorization URL"))
                } else if flow_kind.needs_token_url()
                    && flow.token_url.as_deref().is_none_or(str::is_empty)
                {
                    Some(("tokenUrl", "a token URL"))
                } else if flow.scopes.is_none() {
                    Some(("scopes", "scopes"))
                } else {
                    None
                };
                if let Some((field, what)) = field {
                    return Err(ValidationError::at(
                        field,
                        format!("{} flow must have {what}", flow_kind.as_str()),
                    )
                    .within(flow_kind.as_str())
                    .within("flows"));
                }
            }
            if !any {
                return Err(ValidationError::at("flows", "no OAuth flow is defined"));
            }
        }
        (_, Some(_)) => return forbidden("flows"),
        (_, None) => {}
    }

    if kind == SecuritySchemeType::OpenIdConnect
        && scheme.open_id_connect_url.as_deref().is_none_or(str::is_empty)
    {
        return Err(ValidationError::at(
            "openIdConnectUrl",
            "security scheme of type \"openIdConnect\" should have \"openIdConnectUrl\"",
        ));
    }
    Ok(())
}
