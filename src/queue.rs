//! # Cola Acotada Productor-Consumidor
//! src/queue.rs
//!
//! Cola FIFO thread-safe de capacidad fija. El acceptor encola cada conexión
//! aceptada y los workers la desencolan.
//!
//! ## Semántica
//!
//! - `enqueue` bloquea mientras la cola está llena (backpressure: el acceptor
//!   se detiene en vez de acumular trabajo sin límite).
//! - `dequeue` bloquea mientras la cola está vacía.
//! - Orden estrictamente FIFO; ningún elemento se entrega a dos consumidores.
//!
//! Internamente es un anillo de `capacity` slots con índice de cabeza y
//! contador de ocupados. La cola (tail) se deriva como
//! `(head + len) % capacity`, así ningún contador crece sin límite.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// Anillo interno protegido por el mutex
struct Ring<T> {
    slots: Vec<Option<T>>,
    head: usize,
    len: usize,
    closed: bool,
}

impl<T> Ring<T> {
    fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self {
            slots,
            head: 0,
            len: 0,
            closed: false,
        }
    }

    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    fn push(&mut self, item: T) {
        let tail = (self.head + self.len) % self.capacity();
        debug_assert!(self.slots[tail].is_none());
        self.slots[tail] = Some(item);
        self.len += 1;
    }

    fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let item = self.slots[self.head].take();
        self.head = (self.head + 1) % self.capacity();
        self.len -= 1;
        item
    }

    fn drain(&mut self) -> Vec<T> {
        let mut items = Vec::with_capacity(self.len);
        while let Some(item) = self.pop() {
            items.push(item);
        }
        self.head = 0;
        items
    }
}

struct Shared<T> {
    ring: Mutex<Ring<T>>,
    /// Notifica a los consumidores que hay elementos
    not_empty: Condvar,
    /// Notifica a los productores que hay slots libres
    not_full: Condvar,
}

/// Cola acotada compartida entre el acceptor y el pool de workers.
///
/// Clonar la cola comparte la misma instancia.
pub struct BoundedQueue<T> {
    shared: Arc<Shared<T>>,
}

/// Error de `enqueue`: la cola fue cerrada. Devuelve el elemento.
pub struct QueueClosed<T>(pub T);

/// Error de `try_enqueue`. Ambos casos devuelven el elemento.
pub enum TryEnqueueError<T> {
    /// La cola está llena
    Full(T),
    /// La cola fue cerrada
    Closed(T),
}

impl<T> BoundedQueue<T> {
    /// Crea una cola con `capacity` slots (mínimo 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                ring: Mutex::new(Ring::with_capacity(capacity.max(1))),
                not_empty: Condvar::new(),
                not_full: Condvar::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Ring<T>> {
        self.shared.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserta al final de la cola.
    ///
    /// Bloquea hasta que haya un slot libre. Solo falla si la cola fue
    /// cerrada, en cuyo caso el elemento se devuelve intacto.
    pub fn enqueue(&self, item: T) -> Result<(), QueueClosed<T>> {
        let mut ring = self.lock();

        while ring.is_full() && !ring.closed {
            ring = self
                .shared
                .not_full
                .wait(ring)
                .unwrap_or_else(PoisonError::into_inner);
        }

        if ring.closed {
            return Err(QueueClosed(item));
        }

        ring.push(item);
        drop(ring);

        self.shared.not_empty.notify_one();
        Ok(())
    }

    /// Intenta encolar sin bloquear
    pub fn try_enqueue(&self, item: T) -> Result<(), TryEnqueueError<T>> {
        let mut ring = self.lock();

        if ring.closed {
            return Err(TryEnqueueError::Closed(item));
        }
        if ring.is_full() {
            return Err(TryEnqueueError::Full(item));
        }

        ring.push(item);
        drop(ring);

        self.shared.not_empty.notify_one();
        Ok(())
    }

    /// Remueve y retorna el elemento de la cabeza.
    ///
    /// Bloquea hasta que haya un elemento. Retorna `None` solo cuando la cola
    /// fue cerrada.
    pub fn dequeue(&self) -> Option<T> {
        let mut ring = self.lock();

        loop {
            if ring.closed {
                return None;
            }

            if let Some(item) = ring.pop() {
                drop(ring);
                self.shared.not_full.notify_one();
                return Some(item);
            }

            // Esperar a que haya elementos
            ring = self
                .shared
                .not_empty
                .wait(ring)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Intenta desencolar sin bloquear
    pub fn try_dequeue(&self) -> Option<T> {
        let mut ring = self.lock();
        if ring.closed {
            return None;
        }

        let item = ring.pop();
        drop(ring);

        if item.is_some() {
            self.shared.not_full.notify_one();
        }
        item
    }

    /// Cierra la cola.
    ///
    /// Los elementos pendientes se descartan (para conexiones, esto las
    /// cierra) y todos los hilos bloqueados despiertan: los productores
    /// reciben `QueueClosed` y los consumidores `None`. Idempotente.
    pub fn close(&self) -> usize {
        let pending = {
            let mut ring = self.lock();
            ring.closed = true;
            ring.drain()
        };

        self.shared.not_empty.notify_all();
        self.shared.not_full.notify_all();

        let discarded = pending.len();
        drop(pending);
        discarded
    }

    /// Número de elementos encolados
    pub fn len(&self) -> usize {
        self.lock().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.lock().is_full()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Capacidad fija definida en la construcción
    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }
}

impl<T> Clone for BoundedQueue<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ring = self.lock();
        f.debug_struct("BoundedQueue")
            .field("len", &ring.len)
            .field("capacity", &ring.capacity())
            .field("closed", &ring.closed)
            .finish()
    }
}

impl<T> QueueClosed<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for QueueClosed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("QueueClosed(..)")
    }
}

impl<T> fmt::Display for QueueClosed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("queue is closed")
    }
}

impl<T> std::error::Error for QueueClosed<T> {}

impl<T> TryEnqueueError<T> {
    pub fn into_inner(self) -> T {
        match self {
            TryEnqueueError::Full(item) | TryEnqueueError::Closed(item) => item,
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, TryEnqueueError::Full(_))
    }
}

impl<T> fmt::Debug for TryEnqueueError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TryEnqueueError::Full(_) => f.write_str("Full(..)"),
            TryEnqueueError::Closed(_) => f.write_str("Closed(..)"),
        }
    }
}

impl<T> fmt::Display for TryEnqueueError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TryEnqueueError::Full(_) => f.write_str("queue is full"),
            TryEnqueueError::Closed(_) => f.write_str("queue is closed"),
        }
    }
}

impl<T> std::error::Error for TryEnqueueError<T> {}
