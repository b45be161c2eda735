//! Property tests for request building and content coding.

use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use kiln_app::MediaType;
use kiln_test::{ContentCodec, EmptyContent, TestRequest, DEFAULT_CONTENT_TYPE};
use proptest::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Todo {
    id: i64,
    title: String,
    done: bool,
    tags: Vec<String>,
}

fn todo_strategy() -> impl Strategy<Value = Todo> {
    (
        any::<i64>(),
        ".*",
        any::<bool>(),
        proptest::collection::vec("[a-z]{0,6}", 0..4),
    )
        .prop_map(|(id, title, done, tags)| Todo {
            id,
            title,
            done,
            tags,
        })
}

/// Applies `mask` to the letters of `name`, upper-casing where it is set.
fn with_casing(name: &str, mask: &[bool]) -> String {
    name.chars()
        .zip(mask.iter().chain(std::iter::repeat(&false)))
        .map(|(c, upper)| if *upper { c.to_ascii_uppercase() } else { c })
        .collect()
}

proptest! {
    #[test]
    fn content_type_defaulted_only_when_absent(
        value in proptest::option::of("[a-z]{1,8}/[a-z0-9.+-]{1,12}(; charset=[a-z0-9-]{1,8})?"),
        mask in proptest::collection::vec(any::<bool>(), 12),
        extra in "[a-z]{1,8}",
    ) {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_bytes(format!("x-{extra}").as_bytes()).unwrap(),
            HeaderValue::from_static("1"),
        );
        if let Some(value) = &value {
            let name = with_casing("content-type", &mask);
            headers.insert(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        let before = headers.clone();

        let request = TestRequest::build(
            "/test",
            Method::GET,
            &headers,
            None::<&EmptyContent>,
            None::<&EmptyContent>,
        )
        .unwrap();

        prop_assert_eq!(&headers, &before);
        let content_type = request.headers.get(CONTENT_TYPE).unwrap().to_str().unwrap();
        match &value {
            Some(value) => prop_assert_eq!(content_type, value.as_str()),
            None => prop_assert_eq!(content_type, DEFAULT_CONTENT_TYPE),
        }
        prop_assert_eq!(request.headers.len(), before.len() + usize::from(value.is_none()));
    }

    #[test]
    fn json_round_trip(todo in todo_strategy()) {
        let bytes = ContentCodec::encode(&todo, &MediaType::Json).unwrap().unwrap();
        let decoded: Todo = ContentCodec::decode(&bytes, &MediaType::Json).unwrap();
        prop_assert_eq!(decoded, todo);
    }

    #[test]
    fn empty_content_equals_omitted(segments in proptest::collection::vec("[a-z0-9]{1,6}", 1..4)) {
        let path = format!("/{}", segments.join("/"));
        let headers = HeaderMap::new();

        let omitted = TestRequest::build(
            &path,
            Method::POST,
            &headers,
            None::<&EmptyContent>,
            None::<&EmptyContent>,
        )
        .unwrap();
        let sentinel = TestRequest::build(
            &path,
            Method::POST,
            &headers,
            Some(&EmptyContent),
            Some(&EmptyContent),
        )
        .unwrap();

        prop_assert_eq!(&omitted.method, &sentinel.method);
        prop_assert_eq!(&omitted.uri, &sentinel.uri);
        prop_assert_eq!(&omitted.headers, &sentinel.headers);
        prop_assert_eq!(&omitted.body, &sentinel.body);
        prop_assert!(sentinel.body.is_none());
        prop_assert!(sentinel.query.is_none());
    }
}
