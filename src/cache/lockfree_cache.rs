use crate::cache::{CacheEntry, CacheKey, CacheStats};
use crate::cache::lockfree_lru::LockFreeLruCache;
use crate::dns::DNSPacket;
use crate::pool::StringInterner;
use std::sync::Arc;
use tracing::{debug, trace};

/// Lock-free DNS cache implementation for maximum performance
pub struct LockFreeDnsCache {
    cache: LockFreeLruCache<CacheKey, CacheEntry>,
    negative_ttl: u32,
    stats: Arc<CacheStats>,
    string_interner: Arc<StringInterner>,
}

impl LockFreeDnsCache {
    pub fn new(capacity: usize, negative_ttl: u32) -> Self {
        Self {
            cache: LockFreeLruCache::new(capacity),
            negative_ttl,
            stats: Arc::new(CacheStats::new()),
            string_interner: Arc::new(StringInterner::new(10000)),
        }
    }

    /// Get a cached response if it exists and hasn't expired
    pub fn get(&self, key: &CacheKey) -> Option<DNSPacket> {
        if let Some(entry) = self.cache.get(key) {
            if let Some(response) = entry.get_response() {
                self.stats.record_hit();
                
                if entry.is_negative {
                    self.stats.record_negative_hit();
                    trace!(
                        "Negative cache hit for domain: {} (RCODE={})",
                        key.domain, response.header.rcode
                    );
                } else {
                    trace!("Positive cache hit for domain: {}", key.domain);
                }
                
                return Some(response);
            } else {
                // Entry expired, stats are updated but we don't actively remove
                // The LRU will handle eviction when capacity is reached
                self.stats.record_expired_eviction();
                self.stats.record_miss(); // Also count as miss since we can't use it
                debug!("Expired cache entry for domain: {}", key.domain);
                return None;
            }
        }
        
        self.stats.record_miss();
        trace!("Cache miss for domain: {}", key.domain);
        None
    }

    /// Insert a response into the cache
    pub fn insert(&self, key: CacheKey, entry: CacheEntry) {
        trace!(
            "Inserting {} cache entry for domain: {}, TTL: {}",
            if entry.is_negative { "negative" } else { "positive" },
            key.domain,
            entry.original_ttl
        );
        
        // Track NXDOMAIN and NODATA responses for statistics
        if entry.is_negative {
            match entry.response.header.rcode {
                3 => self.stats.record_nxdomain_response(),
                _ => self.stats.record_nodata_response(),
            }
        }
        
        // Use the entry's TTL for the cache duration
        let ttl = std::time::Duration::from_secs(entry.original_ttl as u64);
        self.cache.put(key, entry, ttl);
    }

    /// Get cache statistics
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Get current cache size
    pub fn size(&self) -> usize {
        self.cache.len()
    }

    /// Clear the cache
    pub fn clear(&self) {
        self.cache.clear();
        debug!("Cache cleared");
    }

    /// Get the string interner for domain normalization
    pub fn interner(&self) -> &StringInterner {
        &self.string_interner
    }
}
