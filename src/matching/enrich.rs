// src/matching/enrich.rs
//! Late-bound product display data (title, image, vendor, description).
//!
//! Product info arrives after matching, often in two batches (recommended
//! first, the rest in the background). `enrich` only ever writes display
//! fields, so it can run any number of times on the same records without
//! re-running normalization.

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use super::NormalizedProduct;
use crate::lenient;

pub const PLACEHOLDER_IMAGE: &str = "/images/product-placeholder.jpg";
pub const PLACEHOLDER_VENDOR: &str = "Fournisseur";
pub const DEFAULT_TITLE_PREFIX: &str = "Produit";

/// Placeholders used before any product info has arrived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayDefaults {
    pub placeholder_image: String,
    pub placeholder_vendor: String,
    pub product_title_prefix: String,
}

impl Default for DisplayDefaults {
    fn default() -> Self {
        Self {
            placeholder_image: PLACEHOLDER_IMAGE.to_string(),
            placeholder_vendor: PLACEHOLDER_VENDOR.to_string(),
            product_title_prefix: DEFAULT_TITLE_PREFIX.to_string(),
        }
    }
}

/// Descriptive product data, flattened from whichever shape the backend sent.
///
/// An object with a `produit` key is the `get_info_produit` item shape
/// (`{ produit: {...}, vendeur: { domaine } }`); anything else is read as the
/// flat camelCase shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInfo {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub vendor_domain: Option<String>,
    pub url: Option<String>,
    pub price: Option<String>,
}

#[derive(Default, Deserialize)]
struct RawProduit {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    titre_produit: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    description_produit: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    image_produit: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    url_produit: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    prix_produit: Option<String>,
}

#[derive(Deserialize)]
struct RawVendeur {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    domaine: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlatInfo {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    description: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    image: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    vendor_domain: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    url: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    price: Option<String>,
}

impl<'de> Deserialize<'de> for ProductInfo {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let v = Value::deserialize(d)?;
        if let Some(produit) = v.get("produit") {
            let produit = RawProduit::deserialize(produit).unwrap_or_else(|e| {
                debug!(error = %e, "unreadable produit block, using empty info");
                RawProduit::default()
            });
            let vendor_domain = v
                .get("vendeur")
                .and_then(|x| RawVendeur::deserialize(x).ok())
                .and_then(|x| x.domaine);
            return Ok(Self {
                title: produit.titre_produit,
                description: produit.description_produit,
                image: produit.image_produit,
                vendor_domain,
                url: produit.url_produit,
                price: produit.prix_produit,
            });
        }
        let f = FlatInfo::deserialize(v).map_err(D::Error::custom)?;
        Ok(Self {
            title: f.title,
            description: f.description,
            image: f.image,
            vendor_domain: f.vendor_domain,
            url: f.url,
            price: f.price,
        })
    }
}

/// A normalized product plus display fields. Matching fields are read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedProduct {
    #[serde(flatten)]
    pub product: NormalizedProduct,
    pub title: String,
    pub image: String,
    pub images: Vec<String>,
    pub vendor_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl EnrichedProduct {
    /// Wrap a normalized product with placeholder display fields.
    pub fn placeholder(product: NormalizedProduct, defaults: &DisplayDefaults) -> Self {
        Self {
            title: format!("{} {}", defaults.product_title_prefix, product.id),
            image: defaults.placeholder_image.clone(),
            images: vec![defaults.placeholder_image.clone()],
            vendor_name: defaults.placeholder_vendor.clone(),
            description: String::new(),
            description_html: None,
            url: None,
            product,
        }
    }

    /// Overwrite display fields from `info`; anything `info` lacks is kept.
    pub fn apply(&mut self, info: &ProductInfo) {
        if let Some(title) = non_blank(&info.title) {
            self.title = title.to_string();
        }
        if let Some(image) = non_blank(&info.image) {
            self.image = image.to_string();
            self.images = vec![image.to_string()];
        }
        if let Some(name) = info.vendor_domain.as_deref().and_then(vendor_name_from_domain) {
            self.vendor_name = name;
        }
        if let Some(html) = non_blank(&info.description) {
            self.description = plain_text(html);
            self.description_html = Some(html.to_string());
        }
        if let Some(url) = non_blank(&info.url) {
            self.url = Some(url.to_string());
        }
    }
}

impl From<NormalizedProduct> for EnrichedProduct {
    fn from(product: NormalizedProduct) -> Self {
        Self::placeholder(product, &DisplayDefaults::default())
    }
}

fn non_blank(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Merge product info into products by id. Order-preserving and idempotent;
/// products without an entry pass through unchanged.
pub fn enrich<P>(products: Vec<P>, info_by_id: &HashMap<String, ProductInfo>) -> Vec<EnrichedProduct>
where
    P: Into<EnrichedProduct>,
{
    let mut applied = 0usize;
    let out: Vec<EnrichedProduct> = products
        .into_iter()
        .map(|p| {
            let mut p: EnrichedProduct = p.into();
            if let Some(info) = info_by_id.get(&p.product.id) {
                p.apply(info);
                applied += 1;
            }
            p
        })
        .collect();
    metrics::counter!("enrich_applied_total").increment(applied as u64);
    debug!(total = out.len(), applied, "enriched products");
    out
}

/// `www.acme-levage.fr` → `ACME-LEVAGE`. `None` for an empty domain.
pub fn vendor_name_from_domain(domain: &str) -> Option<String> {
    static RE_PREFIX: OnceCell<Regex> = OnceCell::new();
    let re = RE_PREFIX.get_or_init(|| Regex::new(r"(?i)^(?:https?://)?(?:www\.)?").unwrap());
    let bare = re.replace(domain.trim(), "");
    let name = bare.split(['.', '/']).next().unwrap_or_default().trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_uppercase())
    }
}

/// HTML description → plain text: tags dropped, entities decoded, whitespace folded.
pub fn plain_text(html: &str) -> String {
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)<[^>]*>").unwrap());
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());

    let stripped = re_tags.replace_all(html, " ");
    let decoded = html_escape::decode_html_entities(&stripped).replace('\u{00A0}', " ");
    re_ws.replace_all(&decoded, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn vendor_name_strips_www_and_tld() {
        assert_eq!(vendor_name_from_domain("www.acme.fr").as_deref(), Some("ACME"));
        assert_eq!(vendor_name_from_domain("levage-pro.com").as_deref(), Some("LEVAGE-PRO"));
        assert_eq!(vendor_name_from_domain("https://www.foo.co.uk/").as_deref(), Some("FOO"));
        assert_eq!(vendor_name_from_domain("  "), None);
    }

    #[test]
    fn plain_text_strips_markup() {
        assert_eq!(
            plain_text("<p>Pont&nbsp;roulant <b>5&nbsp;t</b></p>\n<ul><li>CE</li></ul>"),
            "Pont roulant 5 t CE"
        );
    }

    #[test]
    fn parses_backend_item_shape() {
        let info: ProductInfo = serde_json::from_value(json!({
            "produit": {"id_produit": "1", "titre_produit": "Lift X", "image_produit": "", "prix_produit": "1200"},
            "categorie": {"id_categorie": "3", "nom_categorie": null},
            "vendeur": {"domaine": "www.acme.fr", "etat_societe": null}
        }))
        .unwrap();
        assert_eq!(info.title.as_deref(), Some("Lift X"));
        assert_eq!(info.image, None);
        assert_eq!(info.vendor_domain.as_deref(), Some("www.acme.fr"));
        assert_eq!(info.price.as_deref(), Some("1200"));
    }

    #[test]
    fn unquoted_item_fields_keep_the_item_shape() {
        let info: ProductInfo = serde_json::from_value(json!({
            "produit": {"titre_produit": "Lift X", "prix_produit": 1200, "image_produit": null},
            "vendeur": {"domaine": "www.acme.fr"}
        }))
        .unwrap();
        assert_eq!(info.title.as_deref(), Some("Lift X"));
        assert_eq!(info.price.as_deref(), Some("1200"));
        assert_eq!(info.vendor_domain.as_deref(), Some("www.acme.fr"));
    }

    #[test]
    fn malformed_vendeur_only_loses_the_vendor() {
        let info: ProductInfo = serde_json::from_value(json!({
            "produit": {"titre_produit": "Lift X"},
            "vendeur": "acme"
        }))
        .unwrap();
        assert_eq!(info.title.as_deref(), Some("Lift X"));
        assert_eq!(info.vendor_domain, None);
    }

    #[test]
    fn parses_flat_shape() {
        let info: ProductInfo =
            serde_json::from_value(json!({"title": "Lift X", "vendorDomain": "acme.fr"})).unwrap();
        assert_eq!(info.vendor_domain.as_deref(), Some("acme.fr"));
    }
}
