//! Extracts method signatures and type dependencies from the installed
//! `@datocms/cma-client-node` package's declaration file. The real
//! TypeScript type checker cannot be reimplemented faithfully in Rust, so
//! this crate drives it from a bundled script run inside the workspace
//! (see [`Introspector`]) rather than parsing `.d.ts` files itself.

mod introspector;
mod script;
mod types;

pub use introspector::{Introspector, IntrospectorError};
pub use types::{
    CallSignature, ExpandOptions, ExpandTypes, ExpandedTypes, MethodSignature, Parameter, TypeReference, TypeSymbolId,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_types_serializes_sentinel_as_star() {
        let options = ExpandOptions { max_depth: 2, expand_types: ExpandTypes::All };
        let value = serde_json::to_value(&options).unwrap();
        assert_eq!(value["expandTypes"], "*");
    }

    #[test]
    fn expand_types_named_serializes_as_array() {
        let options = ExpandOptions { max_depth: 3, expand_types: ExpandTypes::Named(vec!["Foo".to_string()]) };
        let value = serde_json::to_value(&options).unwrap();
        assert_eq!(value["expandTypes"], serde_json::json!(["Foo"]));
    }

    #[test]
    fn method_signature_round_trips_distinguishing_symbols_by_id() {
        let json = serde_json::json!({
            "methodName": "create",
            "parameters": [{"name": "body", "type": "ItemCreateSchema", "isOptional": false}],
            "returnType": "Promise<Item>",
            "actionUrl": "https://www.datocms.com/docs/content-management-api/resources/item/create",
            "referencedTypeSymbols": [
                {"name": "ItemCreateSchema", "symbol": "/pkg/dist/types/ApiTypes.d.ts::ApiTypes.ItemCreateSchema"},
                {"name": "ItemCreateSchema", "symbol": "/pkg/dist/types/RawApiTypes.d.ts::RawApiTypes.ItemCreateSchema"}
            ],
            "overloads": []
        });

        let signature: MethodSignature = serde_json::from_value(json).unwrap();
        assert_eq!(signature.referenced_type_symbols.len(), 2);
        assert_ne!(signature.referenced_type_symbols[0].symbol, signature.referenced_type_symbols[1].symbol);
        assert_eq!(signature.referenced_type_symbols[0].name, signature.referenced_type_symbols[1].name);
    }

    #[test]
    fn signature_response_with_null_signature_means_not_found() {
        let json = serde_json::json!({"status": "signature", "signature": null});
        let response: types::IntrospectResponse = serde_json::from_value(json).unwrap();
        match response {
            types::IntrospectResponse::Signature { signature } => assert!(signature.is_none()),
            other => panic!("unexpected response: {other:?}"),
        }
    }
}
