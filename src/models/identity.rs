// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Claims carried by Casdoor-issued identity tokens.

use serde::{Deserialize, Serialize};

/// Decoded payload of a provider access token.
///
/// Casdoor flattens the user object into the token, so profile fields sit
/// next to the registered claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityClaims {
    #[serde(default)]
    pub sub: String,
    /// Username within the organization
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub avatar: String,
    /// Organization
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub iss: String,
    pub exp: u64,
}
