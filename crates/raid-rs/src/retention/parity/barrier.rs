//! Quiescence barrier between parity writers and repair.

use parking_lot::{Condvar, Mutex};

#[derive(Default)]
struct BarrierState {
    repairing: bool,
    active_writers: usize,
}

/// RepairBarrier lets writers run concurrently with each other while a repair
/// runs alone: new writers queue behind a repair in progress, and a repair
/// queues behind writers already in flight.
#[derive(Default)]
pub struct RepairBarrier {
    state: Mutex<BarrierState>,
    cond: Condvar,
}

impl RepairBarrier {
    /// Registers an in-flight writer, waiting first if a repair is running.
    pub fn enter_write(&self) -> WriteTicket<'_> {
        let mut st = self.state.lock();
        while st.repairing {
            self.cond.wait(&mut st);
        }
        st.active_writers += 1;
        WriteTicket { barrier: self }
    }

    /// Claims the repair slot and waits until no writer is in flight.
    pub fn begin_repair(&self) -> RepairTicket<'_> {
        let mut st = self.state.lock();
        while st.repairing {
            self.cond.wait(&mut st);
        }
        st.repairing = true;
        while st.active_writers > 0 {
            self.cond.wait(&mut st);
        }
        RepairTicket { barrier: self }
    }

    #[cfg(test)]
    pub(crate) fn active_writers(&self) -> usize {
        self.state.lock().active_writers
    }

    #[cfg(test)]
    pub(crate) fn is_repairing(&self) -> bool {
        self.state.lock().repairing
    }
}

pub struct WriteTicket<'a> {
    barrier: &'a RepairBarrier,
}

impl Drop for WriteTicket<'_> {
    fn drop(&mut self) {
        let mut st = self.barrier.state.lock();
        st.active_writers -= 1;
        if st.active_writers == 0 {
            self.barrier.cond.notify_all();
        }
    }
}

pub struct RepairTicket<'a> {
    barrier: &'a RepairBarrier,
}

impl Drop for RepairTicket<'_> {
    fn drop(&mut self) {
        self.barrier.state.lock().repairing = false;
        self.barrier.cond.notify_all();
    }
}
