use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, DateTime as BsonDateTime, Document};
use mongodb::options::{ClientOptions, FindOptions, IndexOptions, UpdateOptions};
use mongodb::{Client as MongoClient, Collection, Database, IndexModel};
use serde::Deserialize;

use super::{build_view, HotelStore};
use crate::models::*;

const PROPERTIES: &str = "properties";
const PROPERTY_I18N: &str = "property_i18n";
const REVIEWS: &str = "reviews";
const INGEST_MISSES: &str = "ingest_misses";

#[derive(Debug, Deserialize)]
struct PropertyDoc {
    #[serde(rename = "_id")]
    id: i64,
    brand_id: Option<i64>,
    stars: Option<i32>,
    lat: Option<f64>,
    lon: Option<f64>,
    country: Option<String>,
    city: Option<String>,
    address_raw: Option<String>,
    #[serde(default)]
    amenities: Vec<String>,
    #[serde(default)]
    images: Vec<String>,
    #[serde(default)]
    raw: Bson,
}

impl From<PropertyDoc> for Hotel {
    fn from(d: PropertyDoc) -> Self {
        Hotel {
            id: d.id,
            brand_id: d.brand_id,
            stars: d.stars,
            lat: d.lat,
            lon: d.lon,
            country: d.country,
            city: d.city,
            address_raw: d.address_raw,
            amenities: d.amenities,
            images: d.images,
            raw: d.raw.into_relaxed_extjson(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct I18nDoc {
    property_id: i64,
    lang: String,
    name: Option<String>,
    description: Option<String>,
    policies: Option<String>,
    address: Option<String>,
    #[serde(default)]
    extras: Document,
}

impl From<I18nDoc> for HotelI18n {
    fn from(d: I18nDoc) -> Self {
        let extras = match Bson::Document(d.extras).into_relaxed_extjson() {
            serde_json::Value::Object(map) => map,
            _ => JsonObject::new(),
        };
        HotelI18n {
            property_id: d.property_id,
            lang: d.lang,
            name: d.name,
            description: d.description,
            policies: d.policies,
            address: d.address,
            extras,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReviewDoc {
    property_id: i64,
    source_id: String,
    author: Option<String>,
    rating: Option<f64>,
    lang: Option<String>,
    title: Option<String>,
    text: Option<String>,
    aspects: Option<Aspects>,
    source: Option<String>,
    #[serde(default)]
    raw: Bson,
    created_at: Option<BsonDateTime>,
}

impl From<ReviewDoc> for Review {
    fn from(d: ReviewDoc) -> Self {
        Review {
            property_id: d.property_id,
            source_id: d.source_id,
            author: d.author,
            rating: d.rating,
            lang: d.lang,
            title: d.title,
            text: d.text,
            aspects: d.aspects,
            source: d.source,
            raw: d.raw.into_relaxed_extjson(),
            created_at: d.created_at.map(|t| t.to_chrono()),
        }
    }
}

/// MongoDB adapter. One collection per record kind; natural keys are enforced by unique indexes.
#[derive(Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub fn with_db(db: Database) -> Self {
        Self { db }
    }

    pub async fn connect(uri: &str, database_name: &str) -> Result<Self> {
        let options = ClientOptions::parse(uri).await?;
        let client = MongoClient::with_options(options)?;
        Ok(Self::with_db(client.database(database_name)))
    }

    /// Create the natural-key unique indexes and the review ordering index. Safe to repeat.
    pub async fn ensure_indexes(&self) -> Result<()> {
        let unique = || IndexOptions::builder().unique(true).build();

        self.db
            .collection::<Document>(PROPERTY_I18N)
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "property_id": 1, "lang": 1 })
                    .options(unique())
                    .build(),
                None,
            )
            .await?;

        let reviews = self.db.collection::<Document>(REVIEWS);
        reviews
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "property_id": 1, "source": 1, "source_id": 1 })
                    .options(unique())
                    .build(),
                None,
            )
            .await?;
        reviews
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "property_id": 1, "created_at": -1, "_id": -1 })
                    .build(),
                None,
            )
            .await?;

        self.db
            .collection::<Document>(INGEST_MISSES)
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "property_id": 1, "reason": 1 })
                    .options(unique())
                    .build(),
                None,
            )
            .await?;

        tracing::info!("Database indexes ensured");
        Ok(())
    }

    fn upsert() -> UpdateOptions {
        UpdateOptions::builder().upsert(true).build()
    }
}

/// BSON has no unsigned 64-bit integer; integers above `i64::MAX` are kept as decimal strings.
fn payload_bson(value: &serde_json::Value) -> Result<Bson> {
    Ok(mongodb::bson::to_bson(&widen_unsigned(value))?)
}

fn widen_unsigned(value: &serde_json::Value) -> serde_json::Value {
    use serde_json::Value;
    match value {
        Value::Number(n) if n.as_i64().is_none() && n.as_u64().is_some() => Value::String(n.to_string()),
        Value::Array(items) => Value::Array(items.iter().map(widen_unsigned).collect()),
        Value::Object(map) => Value::Object(
            map.iter().map(|(k, v)| (k.clone(), widen_unsigned(v))).collect(),
        ),
        other => other.clone(),
    }
}

/// `$set` body for a review: only fields carried by the incoming record.
fn review_set_fields(review: &Review) -> Result<Document> {
    let mut set = doc! {
        "raw": payload_bson(&review.raw)?,
        "updated_at": BsonDateTime::now(),
    };
    if let Some(v) = &review.author {
        set.insert("author", v.clone());
    }
    if let Some(v) = review.rating {
        set.insert("rating", v);
    }
    if let Some(v) = &review.lang {
        set.insert("lang", v.clone());
    }
    if let Some(v) = &review.title {
        set.insert("title", v.clone());
    }
    if let Some(v) = &review.text {
        set.insert("text", v.clone());
    }
    if let Some(v) = &review.aspects {
        set.insert("aspects", mongodb::bson::to_bson(v)?);
    }
    Ok(set)
}

#[async_trait]
impl HotelStore for MongoStore {
    async fn upsert_property(&self, hotel: &Hotel) -> Result<()> {
        let collection: Collection<Document> = self.db.collection(PROPERTIES);
        let update = doc! {
            "$set": {
                "brand_id": hotel.brand_id,
                "stars": hotel.stars,
                "lat": hotel.lat,
                "lon": hotel.lon,
                "country": hotel.country.clone(),
                "city": hotel.city.clone(),
                "address_raw": hotel.address_raw.clone(),
                "amenities": hotel.amenities.clone(),
                "images": hotel.images.clone(),
                "raw": payload_bson(&hotel.raw)?,
                "updated_at": BsonDateTime::now(),
            },
            "$setOnInsert": { "created_at": BsonDateTime::now() },
        };
        collection
            .update_one(doc! { "_id": hotel.id }, update, Self::upsert())
            .await?;
        Ok(())
    }

    async fn upsert_i18n(&self, i18n: &HotelI18n) -> Result<()> {
        let properties: Collection<Document> = self.db.collection(PROPERTIES);
        let exists = properties
            .count_documents(doc! { "_id": i18n.property_id }, None)
            .await?
            > 0;
        if !exists {
            return Err(IngestionError::Storage(format!(
                "cannot store {} translation: hotel {} does not exist",
                i18n.lang, i18n.property_id
            )));
        }

        let collection: Collection<Document> = self.db.collection(PROPERTY_I18N);
        let update = doc! {
            "$set": {
                "name": i18n.name.clone(),
                "description": i18n.description.clone(),
                "policies": i18n.policies.clone(),
                "address": i18n.address.clone(),
                "extras": payload_bson(&serde_json::Value::Object(i18n.extras.clone()))?,
                "updated_at": BsonDateTime::now(),
            },
        };
        collection
            .update_one(
                doc! { "property_id": i18n.property_id, "lang": i18n.lang.clone() },
                update,
                Self::upsert(),
            )
            .await?;
        Ok(())
    }

    async fn upsert_reviews(&self, reviews: &[Review]) -> Result<usize> {
        let collection: Collection<Document> = self.db.collection(REVIEWS);
        for review in reviews {
            let filter = doc! {
                "property_id": review.property_id,
                "source": review.source.clone(),
                "source_id": review.source_id.clone(),
            };
            let update = doc! {
                "$set": review_set_fields(review)?,
                "$setOnInsert": { "created_at": BsonDateTime::now() },
            };
            collection.update_one(filter, update, Self::upsert()).await?;
        }
        Ok(reviews.len())
    }

    async fn record_miss(&self, property_id: i64, http_status: u16, reason: &str) -> Result<()> {
        let collection: Collection<Document> = self.db.collection(INGEST_MISSES);
        let update = doc! {
            "$set": { "seen_at": BsonDateTime::now() },
            "$setOnInsert": { "http_status": http_status as i32 },
        };
        collection
            .update_one(
                doc! { "property_id": property_id, "reason": reason },
                update,
                Self::upsert(),
            )
            .await?;
        Ok(())
    }

    async fn get_hotel(&self, id: i64, lang: &str) -> Result<Option<HotelView>> {
        let properties: Collection<PropertyDoc> = self.db.collection(PROPERTIES);
        let Some(hotel) = properties.find_one(doc! { "_id": id }, None).await? else {
            return Ok(None);
        };
        let hotel = Hotel::from(hotel);

        let translations: Collection<I18nDoc> = self.db.collection(PROPERTY_I18N);
        let i18n = translations
            .find_one(doc! { "property_id": id, "lang": lang }, None)
            .await?
            .map(HotelI18n::from);

        Ok(Some(build_view(&hotel, i18n.as_ref(), lang)))
    }

    async fn list_reviews(&self, id: i64, page: &PageQuery) -> Result<ReviewsPage> {
        let collection: Collection<ReviewDoc> = self.db.collection(REVIEWS);
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1, "_id": -1 })
            .limit(page.limit as i64)
            .build();
        let cursor = collection.find(doc! { "property_id": id }, options).await?;
        let docs: Vec<ReviewDoc> = cursor.try_collect().await?;
        Ok(ReviewsPage {
            items: docs.into_iter().map(Review::from).collect(),
            next_cursor: None,
        })
    }
}
