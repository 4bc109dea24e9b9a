//! Shared domain models returned by the property API.

use serde::{Deserialize, Serialize};

/// Success wrapper around every API payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Response payload.
    pub data: T,
}

impl<T> Envelope<T> {
    /// Wrap a payload.
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Anything with a stable identifier the favourites overlay can match on.
pub trait Identified {
    /// Identifier used for membership tests.
    fn id(&self) -> &str;
}

/// Photo attached to a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    /// Absolute or relative image URL.
    pub url: String,
}

/// Named place (city, state, country).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    /// Display name.
    pub name: String,
}

/// Postal code with its resolved places.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZipCode {
    /// Postal code, when the API includes it.
    #[serde(default)]
    pub code: Option<String>,
    /// City the code belongs to.
    pub city: Place,
    /// State or region.
    pub state: Place,
    /// Country.
    pub country: Place,
}

/// Street address of a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    /// Street line.
    pub street: String,
    /// Postal code and places.
    pub zip_code: ZipCode,
}

impl Address {
    /// "City, State, Country" line.
    pub fn locality(&self) -> String {
        format!(
            "{}, {}, {}",
            self.zip_code.city.name, self.zip_code.state.name, self.zip_code.country.name
        )
    }
}

/// Entry of the listings collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingSummary {
    /// Listing identifier.
    pub id: String,
    /// Headline.
    #[serde(default)]
    pub title: String,
    /// Asking price.
    #[serde(default)]
    pub price: Option<f64>,
    /// Short description shown on cards.
    #[serde(default)]
    pub short_description: Option<String>,
    /// Room count.
    #[serde(default)]
    pub no_of_rooms: Option<u32>,
    /// Bathroom count.
    #[serde(default, rename = "noOfBathRooms")]
    pub no_of_bathrooms: Option<u32>,
    /// Floor area in square feet.
    #[serde(default)]
    pub square_feet: Option<u32>,
    /// Photos, first one is the cover.
    #[serde(default)]
    pub photos: Vec<Photo>,
}

impl Identified for ListingSummary {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Full listing returned by the detail endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingDetail {
    /// Listing identifier.
    pub id: String,
    /// Headline.
    pub title: String,
    /// Asking price.
    #[serde(default)]
    pub price: Option<f64>,
    /// Long-form description.
    #[serde(default)]
    pub long_description: Option<String>,
    /// Room count.
    #[serde(default)]
    pub no_of_rooms: Option<u32>,
    /// Bathroom count.
    #[serde(default, rename = "noOfBathRooms")]
    pub no_of_bathrooms: Option<u32>,
    /// Floor area in square feet.
    #[serde(default)]
    pub square_feet: Option<u32>,
    /// Street address.
    #[serde(default)]
    pub address: Option<Address>,
    /// Photos, first one is the cover.
    #[serde(default)]
    pub photos: Vec<Photo>,
}

impl ListingDetail {
    /// Cover photo, if the listing has any.
    pub fn cover_photo(&self) -> Option<&Photo> {
        self.photos.first()
    }
}

impl Identified for ListingDetail {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Full favourite record returned by the favourites endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavouriteListing {
    /// Identifier of the favourited listing.
    pub id: String,
    /// Remaining listing fields, kept as returned by the API.
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl Identified for FavouriteListing {
    fn id(&self) -> &str {
        &self.id
    }
}

/// `GET listings` payload.
pub type ListingsResponse = Envelope<Vec<ListingSummary>>;
/// `GET listing/<id>` payload.
pub type ListingResponse = Envelope<ListingDetail>;
/// `GET favourites/ids` payload.
pub type FavouriteIdsResponse = Envelope<Vec<String>>;
/// `GET favourites` payload.
pub type FavouritesResponse = Envelope<Vec<FavouriteListing>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_detail_with_camel_case_fields() {
        let raw = serde_json::json!({
            "data": {
                "id": "p9",
                "title": "Loft",
                "price": 1200.0,
                "longDescription": "Bright loft",
                "noOfRooms": 2,
                "noOfBathRooms": 1,
                "squareFeet": 640,
                "address": {
                    "street": "1 Main St",
                    "zipCode": {
                        "city": { "name": "Pune" },
                        "state": { "name": "MH" },
                        "country": { "name": "India" }
                    }
                },
                "photos": [{ "url": "https://img/1.jpg" }]
            }
        });
        let detail: ListingResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(detail.data.no_of_bathrooms, Some(1));
        assert_eq!(detail.data.cover_photo().unwrap().url, "https://img/1.jpg");
        assert_eq!(
            detail.data.address.unwrap().locality(),
            "Pune, MH, India"
        );
    }

    #[test]
    fn envelope_requires_data() {
        let result = serde_json::from_str::<FavouriteIdsResponse>(r#"{"items": []}"#);
        assert!(result.is_err());
    }
}
