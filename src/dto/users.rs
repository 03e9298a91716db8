use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{User, UserAddress};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AddressRequest {
    pub name: String,
    pub phone: String,
    pub state: String,
    pub pincode: String,
    pub address: String,
    #[serde(default)]
    pub is_default: bool,
}

impl AddressRequest {
    pub fn has_blank_field(&self) -> bool {
        [
            &self.name,
            &self.phone,
            &self.state,
            &self.pincode,
            &self.address,
        ]
        .iter()
        .any(|v| v.trim().is_empty())
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct UserList {
    #[schema(value_type = Vec<User>)]
    pub items: Vec<User>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct AddressList {
    #[schema(value_type = Vec<UserAddress>)]
    pub items: Vec<UserAddress>,
}
