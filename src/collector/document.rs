//! XML/JSON 페이로드 정규화
//!
//! Eureka는 `Accept` 헤더에 따라 XML 또는 JSON을 반환합니다. 두 형식을
//! 하나의 `serde_json::Value` 트리로 변환하여 파서가 형식과 무관하게
//! 동작하도록 합니다.
//!
//! XML 변환 규칙:
//! - 문서는 루트 요소 하나를 담은 객체가 됩니다 (`{"applications": [{...}]}`)
//! - 자식과 속성이 없는 요소는 앞뒤 공백을 제거한 텍스트 문자열이 됩니다
//! - 그 외 요소는 같은 이름끼리 배열로 모인 객체가 되며, 속성은 문자열 필드가 됩니다

use serde_json::{Map, Value};

use super::parser::ParseError;

/// 페이로드 형식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormat {
    Xml,
    Json,
}

impl PayloadFormat {
    /// 첫 번째 공백 아닌 문자로 형식 판별
    pub fn detect(payload: &str) -> Option<Self> {
        match payload.trim_start_matches('\u{feff}').trim_start().chars().next() {
            Some('<') => Some(PayloadFormat::Xml),
            Some('{') | Some('[') => Some(PayloadFormat::Json),
            _ => None,
        }
    }
}

/// 페이로드를 JSON 트리로 정규화
pub fn normalize(payload: &[u8]) -> Result<Value, ParseError> {
    let text = std::str::from_utf8(payload).map_err(|e| ParseError::Encoding(e.to_string()))?;

    match PayloadFormat::detect(text) {
        Some(PayloadFormat::Json) => {
            serde_json::from_str(text).map_err(|e| ParseError::Json(e.to_string()))
        }
        Some(PayloadFormat::Xml) => xml_to_value(text.trim_start_matches('\u{feff}')),
        None if text.trim().is_empty() => Err(ParseError::Empty),
        None => Err(ParseError::UnknownFormat),
    }
}

fn xml_to_value(text: &str) -> Result<Value, ParseError> {
    let document = roxmltree::Document::parse(text).map_err(|e| ParseError::Xml(e.to_string()))?;
    let root = document.root_element();

    let mut wrapper = Map::new();
    wrapper.insert(
        root.tag_name().name().to_string(),
        Value::Array(vec![element_to_object(root)]),
    );
    Ok(Value::Object(wrapper))
}

fn element_to_object(node: roxmltree::Node<'_, '_>) -> Value {
    let mut object = Map::new();

    for attr in node.attributes() {
        object.insert(attr.name().to_string(), Value::String(attr.value().to_string()));
    }

    for child in node.children().filter(|n| n.is_element()) {
        let name = child.tag_name().name().to_string();
        if is_leaf(child) {
            object.insert(name, Value::String(leaf_text(child)));
            continue;
        }

        let converted = element_to_object(child);
        match object.get_mut(&name) {
            Some(Value::Array(items)) => items.push(converted),
            _ => {
                object.insert(name, Value::Array(vec![converted]));
            }
        }
    }

    Value::Object(object)
}

fn is_leaf(node: roxmltree::Node<'_, '_>) -> bool {
    node.attributes().next().is_none() && !node.children().any(|n| n.is_element())
}

fn leaf_text(node: roxmltree::Node<'_, '_>) -> String {
    node.children()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect::<String>()
        .trim()
        .to_string()
}
