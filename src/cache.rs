use std::collections::HashMap;
use std::hash::Hash;

const NIL: usize = usize::MAX;

pub type EvictionCallback<K, V> = Box<dyn FnMut(&K, &V)>;

/// Counters reported by [`LruCache::stats`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: usize,
    pub max_size: usize,
}

impl CacheStats {
    /// Hit percentage over all lookups, 0 when nothing was looked up yet.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64 * 100.0
        }
    }
}

struct Node<K, V> {
    key: K,
    value: V,
    prev: usize,
    next: usize,
}

/// Bounded mapping with least-recently-used eviction and access statistics.
///
/// The recency list is intrusive over a slab of nodes, so every single-key
/// operation is amortized constant time. `peek` and `has` observe without
/// touching the recency order.
pub struct LruCache<K, V> {
    map: HashMap<K, usize>,
    nodes: Vec<Option<Node<K, V>>>,
    free: Vec<usize>,
    head: usize,
    tail: usize,
    max_size: usize,
    hits: u64,
    misses: u64,
    evictions: u64,
    on_evict: Option<EvictionCallback<K, V>>,
}

impl<K: Eq + Hash + Clone, V> LruCache<K, V> {
    /// Panics when `max_size` is zero.
    pub fn new(max_size: usize) -> Self {
        assert!(max_size > 0, "cache capacity must be positive");
        LruCache {
            map: HashMap::new(),
            nodes: Vec::new(),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
            max_size,
            hits: 0,
            misses: 0,
            evictions: 0,
            on_evict: None,
        }
    }

    pub fn with_eviction_callback(max_size: usize, callback: EvictionCallback<K, V>) -> Self {
        let mut cache = Self::new(max_size);
        cache.on_evict = Some(callback);
        cache
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Look a key up and mark it most-recently-used on a hit.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        match self.map.get(key).copied() {
            Some(idx) => {
                self.hits += 1;
                self.touch(idx);
                Some(&self.nodes[idx].as_ref().unwrap().value)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Look a key up without affecting recency or counters.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.map
            .get(key)
            .map(|&idx| &self.nodes[idx].as_ref().unwrap().value)
    }

    pub fn has(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Insert or update. A fresh key may evict the least-recent entry; an
    /// update never evicts.
    pub fn set(&mut self, key: K, value: V) {
        if let Some(&idx) = self.map.get(&key) {
            self.nodes[idx].as_mut().unwrap().value = value;
            self.touch(idx);
            return;
        }
        if self.map.len() >= self.max_size {
            self.evict_lru();
        }
        let idx = self.alloc(Node {
            key: key.clone(),
            value,
            prev: NIL,
            next: NIL,
        });
        self.map.insert(key, idx);
        self.push_front(idx);
    }

    /// Remove a key. Does not fire the eviction callback.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let idx = self.map.remove(key)?;
        self.unlink(idx);
        let node = self.nodes[idx].take().unwrap();
        self.free.push(idx);
        Some(node.value)
    }

    /// Drop every entry, firing the eviction callback for each.
    pub fn clear(&mut self) {
        let mut idx = self.head;
        while idx != NIL {
            let node = self.nodes[idx].take().unwrap();
            if let Some(cb) = self.on_evict.as_mut() {
                cb(&node.key, &node.value);
            }
            idx = node.next;
        }
        self.map.clear();
        self.nodes.clear();
        self.free.clear();
        self.head = NIL;
        self.tail = NIL;
    }

    /// Keys ordered most-recently-used first.
    pub fn keys(&self) -> Vec<K> {
        let mut out = Vec::with_capacity(self.map.len());
        let mut idx = self.head;
        while idx != NIL {
            let node = self.nodes[idx].as_ref().unwrap();
            out.push(node.key.clone());
            idx = node.next;
        }
        out
    }

    /// Shrink (or grow) the bound, evicting least-recent entries until the
    /// cache fits. Panics when `max_size` is zero.
    pub fn resize(&mut self, max_size: usize) {
        assert!(max_size > 0, "cache capacity must be positive");
        while self.map.len() > max_size {
            self.evict_lru();
        }
        self.max_size = max_size;
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            size: self.map.len(),
            max_size: self.max_size,
        }
    }

    pub fn reset_stats(&mut self) {
        self.hits = 0;
        self.misses = 0;
        self.evictions = 0;
    }

    fn alloc(&mut self, node: Node<K, V>) -> usize {
        match self.free.pop() {
            Some(idx) => {
                self.nodes[idx] = Some(node);
                idx
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        }
    }

    fn evict_lru(&mut self) {
        let idx = self.tail;
        debug_assert_ne!(idx, NIL);
        self.unlink(idx);
        let node = self.nodes[idx].take().unwrap();
        self.map.remove(&node.key);
        self.free.push(idx);
        self.evictions += 1;
        if let Some(cb) = self.on_evict.as_mut() {
            cb(&node.key, &node.value);
        }
    }

    fn touch(&mut self, idx: usize) {
        if self.head == idx {
            return;
        }
        self.unlink(idx);
        self.push_front(idx);
    }

    fn push_front(&mut self, idx: usize) {
        let old_head = self.head;
        {
            let node = self.nodes[idx].as_mut().unwrap();
            node.prev = NIL;
            node.next = old_head;
        }
        if old_head != NIL {
            self.nodes[old_head].as_mut().unwrap().prev = idx;
        }
        self.head = idx;
        if self.tail == NIL {
            self.tail = idx;
        }
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = {
            let node = self.nodes[idx].as_ref().unwrap();
            (node.prev, node.next)
        };
        if prev != NIL {
            self.nodes[prev].as_mut().unwrap().next = next;
        } else {
            self.head = next;
        }
        if next != NIL {
            self.nodes[next].as_mut().unwrap().prev = prev;
        } else {
            self.tail = prev;
        }
    }
}
