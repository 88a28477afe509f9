use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

/// Mesmo piso do backend compartilhado, onde PX exige ao menos 1 ms.
const MIN_TTL: Duration = Duration::from_millis(1);
/// Cerca de 30 anos: na prática, nunca expira.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Store de capacidade fixa com despejo LRU e TTL por entrada.
///
/// As entradas vivem numa arena (`slots`); a ordem de acesso é uma lista
/// duplamente ligada intrusiva por índices (`links`), da mais recente
/// (`head`) para a menos recente (`tail`). `index` mapeia chave → slot.
///
/// O despejo remove a `tail` exatamente quando uma chave nova excederia a
/// capacidade, sem olhar TTL. Entradas expiradas são descartadas de forma
/// preguiçosa na leitura e na enumeração.
pub(crate) struct LruArena<V> {
    slots: Vec<Option<Slot<V>>>,
    links: Vec<Link>,
    free: Vec<usize>,
    index: HashMap<String, usize>,
    head: Option<usize>,
    tail: Option<usize>,
    capacity: usize,
    default_ttl: Duration,
}

struct Slot<V> {
    key: String,
    value: V,
    expires_at: Instant,
}

#[derive(Debug, Clone, Copy, Default)]
struct Link {
    prev: Option<usize>,
    next: Option<usize>,
}

impl<V> LruArena<V> {
    pub fn new(capacity: usize, default_ttl: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::with_capacity(capacity),
            links: Vec::with_capacity(capacity),
            free: Vec::new(),
            index: HashMap::with_capacity(capacity),
            head: None,
            tail: None,
            capacity,
            default_ttl,
        }
    }

    /// Número de entradas ocupando slots, incluindo expiradas ainda não coletadas.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Leitura que conta como acesso.
    pub fn get(&mut self, key: &str) -> Option<&V> {
        let idx = self.live_index(key)?;
        self.touch(idx);
        self.slots[idx].as_ref().map(|s| &s.value)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        let idx = self.live_index(key)?;
        self.touch(idx);
        self.slots[idx].as_mut().map(|s| &mut s.value)
    }

    pub fn contains(&mut self, key: &str) -> bool {
        self.live_index(key).is_some()
    }

    /// Insere ou sobrescreve. Retorna a chave despejada, se houve despejo.
    pub fn insert(&mut self, key: String, value: V, ttl: Option<Duration>) -> Option<String> {
        let expires_at = self.deadline(ttl);

        if let Some(&idx) = self.index.get(&key) {
            if let Some(slot) = self.slots[idx].as_mut() {
                slot.value = value;
                slot.expires_at = expires_at;
            }
            self.touch(idx);
            return None;
        }

        let evicted = self.make_room();
        let idx = self.allocate(Slot {
            key: key.clone(),
            value,
            expires_at,
        });
        self.index.insert(key, idx);
        self.push_front(idx);
        evicted
    }

    /// Valor vivo de `key` (criado com `init` se ausente) com TTL renovado.
    /// Retorna também a chave despejada para abrir espaço, se houve.
    pub fn upsert(
        &mut self,
        key: &str,
        ttl: Option<Duration>,
        init: impl FnOnce() -> V,
    ) -> (&mut V, Option<String>) {
        let mut evicted = None;
        let idx = match self.live_index(key) {
            Some(idx) => {
                let expires_at = self.deadline(ttl);
                if let Some(slot) = self.slots[idx].as_mut() {
                    slot.expires_at = expires_at;
                }
                self.touch(idx);
                idx
            }
            None => {
                evicted = self.insert(key.to_string(), init(), ttl);
                self.index[key]
            }
        };
        let value = match self.slots[idx].as_mut() {
            Some(slot) => &mut slot.value,
            None => unreachable!("index aponta para slot ocupado"),
        };
        (value, evicted)
    }

    /// Renova o TTL de uma entrada viva. Não conta como acesso.
    pub fn refresh_ttl(&mut self, key: &str, ttl: Option<Duration>) -> bool {
        let Some(idx) = self.live_index(key) else {
            return false;
        };
        let expires_at = self.deadline(ttl);
        match self.slots[idx].as_mut() {
            Some(slot) => {
                slot.expires_at = expires_at;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<V> {
        let idx = *self.index.get(key)?;
        self.remove_at(idx).map(|s| s.value)
    }

    /// Chaves vivas; descarta as expiradas encontradas no caminho.
    pub fn live_keys(&mut self) -> Vec<String> {
        let now = Instant::now();
        let expired: Vec<usize> = self
            .index
            .values()
            .copied()
            .filter(|&idx| self.slots[idx].as_ref().is_some_and(|s| s.expires_at <= now))
            .collect();
        for idx in expired {
            self.remove_at(idx);
        }
        self.index.keys().cloned().collect()
    }

    /// TTL zero vale 1 ms; TTL que estoura o relógio satura num prazo distante.
    fn deadline(&self, ttl: Option<Duration>) -> Instant {
        let ttl = ttl.unwrap_or(self.default_ttl).max(MIN_TTL);
        let now = Instant::now();
        now.checked_add(ttl).unwrap_or(now + FAR_FUTURE)
    }

    fn live_index(&mut self, key: &str) -> Option<usize> {
        let idx = *self.index.get(key)?;
        let expired = self.slots[idx]
            .as_ref()
            .is_none_or(|s| s.expires_at <= Instant::now());
        if expired {
            self.remove_at(idx);
            return None;
        }
        Some(idx)
    }

    fn make_room(&mut self) -> Option<String> {
        if self.index.len() < self.capacity {
            return None;
        }
        let tail = self.tail?;
        self.remove_at(tail).map(|s| s.key)
    }

    fn allocate(&mut self, slot: Slot<V>) -> usize {
        match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(slot);
                idx
            }
            None => {
                self.slots.push(Some(slot));
                self.links.push(Link::default());
                self.slots.len() - 1
            }
        }
    }

    fn remove_at(&mut self, idx: usize) -> Option<Slot<V>> {
        let slot = self.slots[idx].take()?;
        self.unlink(idx);
        self.index.remove(&slot.key);
        self.free.push(idx);
        Some(slot)
    }

    fn touch(&mut self, idx: usize) {
        if self.head != Some(idx) {
            self.unlink(idx);
            self.push_front(idx);
        }
    }

    fn push_front(&mut self, idx: usize) {
        self.links[idx] = Link {
            prev: None,
            next: self.head,
        };
        match self.head {
            Some(head) => self.links[head].prev = Some(idx),
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
    }

    fn unlink(&mut self, idx: usize) {
        let Link { prev, next } = self.links[idx];
        match prev {
            Some(p) => self.links[p].next = next,
            None if self.head == Some(idx) => self.head = next,
            None => {}
        }
        match next {
            Some(n) => self.links[n].prev = prev,
            None if self.tail == Some(idx) => self.tail = prev,
            None => {}
        }
        self.links[idx] = Link::default();
    }
}
