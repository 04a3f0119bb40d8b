use crate::job::JobResult;

/// Pre-allocated result slots indexed by submission position.
///
/// Workers finish in any order; each result is written into the slot of the
/// job that produced it, so the final sequence always matches input order.
#[derive(Debug)]
pub struct ResultSlots<T> {
    slots: Vec<Option<JobResult<T>>>,
    filled: usize,
}

impl<T> ResultSlots<T> {
    pub fn new(len: usize) -> Self {
        Self {
            slots: std::iter::repeat_with(|| None).take(len).collect(),
            filled: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn filled(&self) -> usize {
        self.filled
    }

    pub fn is_complete(&self) -> bool {
        self.filled == self.slots.len()
    }

    /// Stores `result` at `position`. Returns `false` when the position is out
    /// of range or already holds a result; the existing value is kept.
    pub fn insert(&mut self, position: usize, result: JobResult<T>) -> bool {
        let Some(slot) = self.slots.get_mut(position) else {
            return false;
        };
        if slot.is_some() {
            return false;
        }
        *slot = Some(result);
        self.filled += 1;
        true
    }

    pub fn get(&self, position: usize) -> Option<&JobResult<T>> {
        self.slots.get(position).and_then(Option::as_ref)
    }

    /// Consumes the slots, filling any empty one with `missing(position)`.
    pub fn into_results<F>(self, mut missing: F) -> Vec<JobResult<T>>
    where
        F: FnMut(usize) -> JobResult<T>,
    {
        self.slots
            .into_iter()
            .enumerate()
            .map(|(position, slot)| slot.unwrap_or_else(|| missing(position)))
            .collect()
    }
}
