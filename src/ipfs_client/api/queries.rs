use serde::Serialize;

/// Single positional argument, sent as `?arg=<value>`.
#[derive(Serialize)]
pub struct ArgQuery<'a> {
    pub arg: &'a str,
}

#[derive(Serialize)]
pub struct KeyGenQuery<'a> {
    pub arg: &'a str,
    #[serde(rename = "type")]
    pub key_type: &'a str,
}
