//! Parsing of Kubernetes resource quantity literals

use crate::{CoreError, Result};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use regex::Regex;
use std::sync::LazyLock;

/// `<sign><digits>[.<digits>]<suffix>` where the suffix is a binary SI unit,
/// a decimal SI unit or a decimal exponent.
static QUANTITY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?([0-9]+(\.[0-9]*)?|\.[0-9]+)(Ki|Mi|Gi|Ti|Pi|Ei|n|u|m|k|M|G|T|P|E|[eE][+-]?[0-9]+)?$")
        .expect("quantity pattern is valid")
});

/// Parses a quantity literal such as `10Gi`, `500M` or `1e3`.
pub fn parse_quantity(value: &str) -> Result<Quantity> {
    if QUANTITY_REGEX.is_match(value) {
        Ok(Quantity(value.to_string()))
    } else {
        Err(CoreError::MalformedQuantity {
            value: value.to_string(),
        })
    }
}
