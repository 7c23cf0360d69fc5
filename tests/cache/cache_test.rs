// tests/cache/cache_test.rs
#[cfg(test)]
mod tests {
    use std::time::Duration;

    use sqlsage::cache::{ContextCache, ContextEntry};
    use sqlsage::config::{ConnectionConfig, Driver};
    use sqlsage::profile::DatabaseProfile;
    use sqlsage::schema::SchemaGraph;

    fn entry(database: &str) -> ContextEntry {
        ContextEntry::new(
            SchemaGraph {
                database_name: database.to_string(),
                tables: Vec::new(),
            },
            DatabaseProfile::default(),
        )
    }

    fn config(database: &str, password: &str) -> ConnectionConfig {
        ConnectionConfig {
            driver: Driver::Postgres,
            host: "db.internal".to_string(),
            port: None,
            database: database.to_string(),
            username: "sage".to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_round_trip_through_fingerprint_key() {
        let cache = ContextCache::new(Duration::from_secs(60));
        let config = config("shop", "secret");

        cache.put(config.fingerprint(), entry("shop"));
        let hit = cache.get(&config.fingerprint()).expect("entry should be live");
        assert_eq!(hit.database, "shop");
    }

    #[test]
    fn test_fingerprint_is_stable_across_password_changes() {
        // Rotating a password must not orphan the cached context
        let before = config("shop", "old-password");
        let after = config("shop", "new-password");
        assert_eq!(before.fingerprint(), after.fingerprint());

        let other_db = config("warehouse", "old-password");
        assert_ne!(before.fingerprint(), other_db.fingerprint());
    }

    #[test]
    fn test_entries_expire_after_ttl() {
        let cache = ContextCache::new(Duration::from_millis(30));
        cache.put("fp".to_string(), entry("shop"));
        assert!(cache.get("fp").is_some());

        std::thread::sleep(Duration::from_millis(60));
        assert!(cache.get("fp").is_none());
        // The expired entry was evicted, not just hidden
        assert_eq!(cache.stats().entry_count, 0);
    }

    #[test]
    fn test_distinct_connections_do_not_collide() {
        let cache = ContextCache::new(Duration::from_secs(60));
        let shop = config("shop", "pw");
        let warehouse = config("warehouse", "pw");

        cache.put(shop.fingerprint(), entry("shop"));
        cache.put(warehouse.fingerprint(), entry("warehouse"));

        assert_eq!(cache.get(&shop.fingerprint()).unwrap().database, "shop");
        assert_eq!(
            cache.get(&warehouse.fingerprint()).unwrap().database,
            "warehouse"
        );
        assert_eq!(cache.stats().entry_count, 2);
    }

    #[test]
    fn test_invalidation_only_touches_its_target() {
        let cache = ContextCache::new(Duration::from_secs(60));
        let shop = config("shop", "pw");
        let warehouse = config("warehouse", "pw");

        cache.put(shop.fingerprint(), entry("shop"));
        cache.put(warehouse.fingerprint(), entry("warehouse"));

        assert!(cache.invalidate(&shop.fingerprint()));
        assert!(cache.get(&shop.fingerprint()).is_none());
        assert!(cache.get(&warehouse.fingerprint()).is_some());

        cache.clear_all();
        assert_eq!(cache.stats().entry_count, 0);
    }

    #[test]
    fn test_stats_snapshot() {
        let cache = ContextCache::new(Duration::from_secs(900));
        cache.put("a".to_string(), entry("beta"));
        cache.put("b".to_string(), entry("alpha"));

        let stats = cache.stats();
        assert_eq!(stats.entry_count, 2);
        assert_eq!(stats.ttl_seconds, 900);
        assert_eq!(stats.databases, vec!["alpha".to_string(), "beta".to_string()]);
    }
}
