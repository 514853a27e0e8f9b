//! Cached place-name lookups shared by every session in the process.

use crate::geocode::{short_label, GeocodeError, ReverseGeocoder};
use crate::model::GeoPoint;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

pub const UNKNOWN_LOCATION: &str = "Unknown Location";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CachedPlace {
    Resolved(String),
    Unresolved(GeocodeError),
}

impl CachedPlace {
    pub fn label(&self) -> &str {
        match self {
            CachedPlace::Resolved(label) => label,
            CachedPlace::Unresolved(_) => UNKNOWN_LOCATION,
        }
    }
}

/// Bit-exact coordinate key; `1.0` and `1.0000001` are different entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct CoordKey(u64, u64);

impl From<GeoPoint> for CoordKey {
    fn from(p: GeoPoint) -> Self {
        CoordKey(p.lat.to_bits(), p.lng.to_bits())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CachePolicy {
    pub cache_failures: bool,
}

pub struct PlaceResolver {
    geocoder: Arc<dyn ReverseGeocoder>,
    policy: CachePolicy,
    cache: Mutex<HashMap<CoordKey, CachedPlace>>,
}

impl PlaceResolver {
    pub fn new(geocoder: Arc<dyn ReverseGeocoder>, policy: CachePolicy) -> Self {
        Self {
            geocoder,
            policy,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Short label for display; every failure collapses to
    /// [`UNKNOWN_LOCATION`].
    pub async fn resolve(&self, point: GeoPoint) -> String {
        self.lookup(point).await.label().to_string()
    }

    pub async fn lookup(&self, point: GeoPoint) -> CachedPlace {
        let key = CoordKey::from(point);
        if let Some(hit) = self.cached(key) {
            debug!(lat = point.lat, lng = point.lng, "place cache hit");
            return hit;
        }

        let place = match self.geocoder.reverse(point).await {
            Ok(name) => CachedPlace::Resolved(short_label(&name)),
            Err(err) => {
                warn!(lat = point.lat, lng = point.lng, error = %err, "reverse geocoding failed");
                CachedPlace::Unresolved(err)
            }
        };

        if matches!(place, CachedPlace::Resolved(_)) || self.policy.cache_failures {
            self.entries().insert(key, place.clone());
        }
        place
    }

    pub fn cached_entries(&self) -> usize {
        self.entries().len()
    }

    fn cached(&self, key: CoordKey) -> Option<CachedPlace> {
        self.entries().get(&key).cloned()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<CoordKey, CachedPlace>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingGeocoder {
        calls: AtomicUsize,
        answer: Result<String, GeocodeError>,
    }

    impl CountingGeocoder {
        fn new(answer: Result<String, GeocodeError>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                answer,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ReverseGeocoder for CountingGeocoder {
        async fn reverse(&self, _point: GeoPoint) -> Result<String, GeocodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer.clone()
        }
    }

    #[tokio::test]
    async fn resolved_names_are_shortened_and_cached() {
        let geocoder = CountingGeocoder::new(Ok("Tom Mboya Street, Nairobi, Kenya".into()));
        let resolver = PlaceResolver::new(geocoder.clone(), CachePolicy::default());
        let point = GeoPoint::new(1.2833, 36.8167);

        assert_eq!(resolver.resolve(point).await, "Tom Mboya Street");
        assert_eq!(resolver.resolve(point).await, "Tom Mboya Street");
        assert_eq!(geocoder.calls(), 1);
        assert_eq!(resolver.cached_entries(), 1);
    }

    #[tokio::test]
    async fn distinct_coordinates_are_separate_entries() {
        let geocoder = CountingGeocoder::new(Ok("Somewhere".into()));
        let resolver = PlaceResolver::new(geocoder.clone(), CachePolicy::default());

        resolver.resolve(GeoPoint::new(1.0, 2.0)).await;
        resolver.resolve(GeoPoint::new(1.0, 2.000001)).await;
        assert_eq!(geocoder.calls(), 2);
    }

    #[tokio::test]
    async fn failures_fall_back_and_are_retried_by_default() {
        let geocoder = CountingGeocoder::new(Err(GeocodeError::Timeout));
        let resolver = PlaceResolver::new(geocoder.clone(), CachePolicy::default());
        let point = GeoPoint::new(-1.0, 36.0);

        assert_eq!(resolver.resolve(point).await, UNKNOWN_LOCATION);
        assert_eq!(
            resolver.lookup(point).await,
            CachedPlace::Unresolved(GeocodeError::Timeout)
        );
        assert_eq!(geocoder.calls(), 2);
        assert_eq!(resolver.cached_entries(), 0);
    }

    #[tokio::test]
    async fn failures_can_be_cached_when_configured() {
        let geocoder = CountingGeocoder::new(Err(GeocodeError::NotFound));
        let resolver = PlaceResolver::new(
            geocoder.clone(),
            CachePolicy {
                cache_failures: true,
            },
        );
        let point = GeoPoint::new(0.0, 0.0);

        assert_eq!(resolver.resolve(point).await, UNKNOWN_LOCATION);
        assert_eq!(resolver.resolve(point).await, UNKNOWN_LOCATION);
        assert_eq!(geocoder.calls(), 1);
    }

    #[tokio::test]
    async fn cache_survives_a_poisoned_lock() {
        let geocoder = CountingGeocoder::new(Ok("Moi Avenue, Nairobi".into()));
        let resolver = Arc::new(PlaceResolver::new(geocoder.clone(), CachePolicy::default()));
        let point = GeoPoint::new(1.28, 36.82);
        assert_eq!(resolver.resolve(point).await, "Moi Avenue");

        let poisoner = resolver.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.cache.lock();
            panic!("poison the place cache");
        })
        .join();
        assert!(resolver.cache.is_poisoned());

        assert_eq!(resolver.cached_entries(), 1);
        assert_eq!(resolver.resolve(point).await, "Moi Avenue");
        assert_eq!(geocoder.calls(), 1);

        resolver.resolve(GeoPoint::new(1.29, 36.83)).await;
        assert_eq!(resolver.cached_entries(), 2);
    }

    #[tokio::test]
    async fn unresolved_keeps_the_failure_kind() {
        let geocoder = CountingGeocoder::new(Err(GeocodeError::Unreachable("dns".into())));
        let resolver = PlaceResolver::new(geocoder, CachePolicy::default());

        let place = resolver.lookup(GeoPoint::new(3.0, 4.0)).await;
        assert_eq!(place, CachedPlace::Unresolved(GeocodeError::Unreachable("dns".into())));
        assert_eq!(place.label(), UNKNOWN_LOCATION);
    }
}
