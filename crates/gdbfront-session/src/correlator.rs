//! Token-indexed table of commands awaiting a result record.
//!
//! Each tracked command gets the next token from a monotonic counter and
//! is written as `<token><command>`. Tokens below the counter's base are
//! reserved for fixed tokens a caller reuses by convention.
use std::collections::HashMap;

use gdbfront_mi::Token;

use crate::error::SessionError;

/// Whether a pending entry survives its first result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    /// Removed once its result arrives.
    Temporal,
    /// Invoked again for every result carrying the same token.
    Permanent,
}

/// One command awaiting its result.
#[derive(Debug)]
pub struct Pending<H> {
    /// `None` for the untokened slot.
    pub token: Option<Token>,
    pub handler: H,
    pub retention: Retention,
}

/// Matches result records to the commands that requested them.
#[derive(Debug)]
pub struct Correlator<H> {
    base: Token,
    next: Token,
    pending: HashMap<Token, Pending<H>>,
    untokened: Option<Pending<H>>,
}

impl<H> Correlator<H> {
    /// Create a correlator whose counter starts at `base`.
    pub fn new(base: Token) -> Self {
        Self {
            base,
            next: base,
            pending: HashMap::new(),
            untokened: None,
        }
    }

    /// First token handed out by [`register`](Self::register).
    pub fn base(&self) -> Token {
        self.base
    }

    /// Allocate a fresh token and return it with the wire line to write.
    pub fn register(
        &mut self,
        command: &str,
        handler: H,
        retention: Retention,
    ) -> (Token, String) {
        let token = self.next;
        self.next += 1;
        self.pending.insert(
            token,
            Pending {
                token: Some(token),
                handler,
                retention,
            },
        );
        (token, format!("{token}{command}"))
    }

    /// Track a command under a reserved token below the base.
    ///
    /// # Errors
    ///
    /// `InvalidToken` when `token` is not below the base, `TokenInUse` when
    /// a command with `token` is already pending.
    pub fn register_fixed(
        &mut self,
        token: Token,
        command: &str,
        handler: H,
        retention: Retention,
    ) -> Result<String, SessionError> {
        if token >= self.base {
            return Err(SessionError::InvalidToken {
                token,
                base: self.base,
            });
        }
        if self.pending.contains_key(&token) {
            return Err(SessionError::TokenInUse(token));
        }
        self.pending.insert(
            token,
            Pending {
                token: Some(token),
                handler,
                retention,
            },
        );
        Ok(format!("{token}{command}"))
    }

    /// Track a command sent without a token. Its result is the next
    /// token-less result record.
    ///
    /// # Errors
    ///
    /// `UntokenedBusy` while another untokened command is outstanding.
    pub fn register_untokened(&mut self, handler: H, retention: Retention) -> Result<(), SessionError> {
        if self.untokened.is_some() {
            return Err(SessionError::UntokenedBusy);
        }
        self.untokened = Some(Pending {
            token: None,
            handler,
            retention,
        });
        Ok(())
    }

    /// Remove the entry a result record with `token` belongs to.
    pub fn take(&mut self, token: Option<Token>) -> Option<Pending<H>> {
        match token {
            Some(t) => self.pending.remove(&t),
            None => self.untokened.take(),
        }
    }

    /// Hand back an entry after its handler ran. `Temporal` entries are
    /// dropped; `Permanent` ones are reinstated unless their slot was
    /// claimed in the meantime.
    pub fn restore(&mut self, entry: Pending<H>) {
        if entry.retention == Retention::Temporal {
            return;
        }
        match entry.token {
            Some(t) => {
                self.pending.entry(t).or_insert(entry);
            }
            None => {
                if self.untokened.is_none() {
                    self.untokened = Some(entry);
                }
            }
        }
    }

    /// Remove every pending entry, tokened ones in token order first.
    pub fn drain(&mut self) -> Vec<Pending<H>> {
        let mut entries: Vec<_> = self.pending.drain().map(|(_, p)| p).collect();
        entries.sort_by_key(|p| p.token);
        entries.extend(self.untokened.take());
        entries
    }

    pub fn is_pending(&self, token: Token) -> bool {
        self.pending.contains_key(&token)
    }

    /// How many commands await a result, the untokened slot included.
    pub fn pending_count(&self) -> usize {
        self.pending.len() + usize::from(self.untokened.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fire the handler the way the session does: take, call, restore.
    fn deliver(c: &mut Correlator<Vec<u32>>, token: Option<Token>, value: u32) -> bool {
        match c.take(token) {
            Some(mut entry) => {
                entry.handler.push(value);
                c.restore(entry);
                true
            }
            None => false,
        }
    }

    #[test]
    fn tokens_start_at_base_and_increase() {
        let mut c: Correlator<()> = Correlator::new(100);
        let (t1, line1) = c.register("-break-insert main", (), Retention::Temporal);
        let (t2, _) = c.register("-exec-run", (), Retention::Temporal);
        let (t3, _) = c.register("-stack-list-frames", (), Retention::Temporal);
        assert_eq!(t1, 100);
        assert_eq!(line1, "100-break-insert main");
        assert!(t1 < t2 && t2 < t3);
        assert_eq!(c.pending_count(), 3);
    }

    #[test]
    fn tokens_not_reused_after_completion() {
        let mut c: Correlator<()> = Correlator::new(5);
        let (t1, _) = c.register("a", (), Retention::Temporal);
        assert!(c.take(Some(t1)).is_some());
        let (t2, _) = c.register("b", (), Retention::Temporal);
        assert!(t2 > t1);
    }

    #[test]
    fn temporal_fires_once_then_absent() {
        let mut c = Correlator::new(100);
        let (t, _) = c.register("-thread-info", Vec::new(), Retention::Temporal);
        assert!(deliver(&mut c, Some(t), 1));
        assert!(!c.is_pending(t));
        assert!(!deliver(&mut c, Some(t), 2));
        assert_eq!(c.pending_count(), 0);
    }

    #[test]
    fn permanent_survives_repeated_results() {
        let mut c = Correlator::new(100);
        let line = c
            .register_fixed(7, "-gdb-show version", Vec::new(), Retention::Permanent)
            .unwrap();
        assert_eq!(line, "7-gdb-show version");
        for v in 0..3 {
            assert!(deliver(&mut c, Some(7), v));
        }
        assert!(c.is_pending(7));
        let entries = c.drain();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].handler, vec![0, 1, 2]);
    }

    #[test]
    fn fixed_tokens_must_be_reserved_and_free() {
        let mut c: Correlator<()> = Correlator::new(100);
        assert!(matches!(
            c.register_fixed(100, "x", (), Retention::Temporal),
            Err(SessionError::InvalidToken {
                token: 100,
                base: 100
            })
        ));
        c.register_fixed(1, "x", (), Retention::Temporal).unwrap();
        assert!(matches!(
            c.register_fixed(1, "y", (), Retention::Temporal),
            Err(SessionError::TokenInUse(1))
        ));
    }

    #[test]
    fn untokened_slot_is_exclusive() {
        let mut c = Correlator::new(100);
        c.register_untokened(Vec::new(), Retention::Temporal).unwrap();
        assert!(matches!(
            c.register_untokened(Vec::new(), Retention::Temporal),
            Err(SessionError::UntokenedBusy)
        ));
        assert!(deliver(&mut c, None, 9));
        c.register_untokened(Vec::new(), Retention::Temporal).unwrap();
    }

    #[test]
    fn untokened_results_do_not_touch_tokened_entries() {
        let mut c = Correlator::new(100);
        let (t, _) = c.register("a", Vec::new(), Retention::Temporal);
        assert!(!deliver(&mut c, None, 1));
        assert!(c.is_pending(t));
    }

    #[test]
    fn restore_keeps_newer_registration() {
        let mut c = Correlator::new(100);
        c.register_fixed(3, "a", vec![1], Retention::Permanent).unwrap();
        let old = c.take(Some(3)).unwrap();
        c.register_fixed(3, "b", vec![2], Retention::Temporal).unwrap();
        c.restore(old);
        let entries = c.drain();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].handler, vec![2]);
    }

    #[test]
    fn drain_returns_everything_once() {
        let mut c: Correlator<u8> = Correlator::new(100);
        c.register("b", 2, Retention::Temporal);
        c.register_fixed(1, "a", 1, Retention::Permanent).unwrap();
        c.register_untokened(3, Retention::Temporal).unwrap();
        let handlers: Vec<u8> = c.drain().into_iter().map(|p| p.handler).collect();
        assert_eq!(handlers, vec![1, 2, 3]);
        assert_eq!(c.pending_count(), 0);
        assert!(c.drain().is_empty());
    }
}
