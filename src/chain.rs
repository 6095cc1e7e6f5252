//! Daisy-chain wiring for per-key addressable LEDs.
//!
//! LEDs are linked strictly in key traversal order. Each inter-LED net is
//! named after the downstream LED (`LED7_DIN`), so the whole chain can be
//! reconstructed from reference designators alone.

use serde::Serialize;

pub const LED_VCC_PIN: &str = "1";
pub const LED_DOUT_PIN: &str = "2";
pub const LED_GND_PIN: &str = "3";
pub const LED_DIN_PIN: &str = "4";

pub fn din_net_name(led_ref: &str) -> String {
    format!("{}_DIN", led_ref)
}

/// One DOUT -> DIN hop between consecutive LEDs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainLink {
    pub net_name: String,
    pub upstream: String,
    pub downstream: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ChainState {
    NotStarted,
    /// `head` still has its DIN pending; `tail` owns the open DOUT.
    Linking { head: String, tail: String },
}

#[derive(Debug, Clone)]
pub struct LedChain {
    state: ChainState,
    links: Vec<ChainLink>,
}

impl Default for LedChain {
    fn default() -> Self {
        Self::new()
    }
}

impl LedChain {
    pub fn new() -> Self {
        Self {
            state: ChainState::NotStarted,
            links: Vec::new(),
        }
    }

    /// Appends an LED. Returns the link joining it to its predecessor, if any.
    pub fn push(&mut self, led_ref: &str) -> Option<ChainLink> {
        match &mut self.state {
            ChainState::NotStarted => {
                self.state = ChainState::Linking {
                    head: led_ref.to_string(),
                    tail: led_ref.to_string(),
                };
                None
            }
            ChainState::Linking { tail, .. } => {
                let link = ChainLink {
                    net_name: din_net_name(led_ref),
                    upstream: std::mem::replace(tail, led_ref.to_string()),
                    downstream: led_ref.to_string(),
                };
                self.links.push(link.clone());
                Some(link)
            }
        }
    }

    pub fn len(&self) -> usize {
        match self.state {
            ChainState::NotStarted => 0,
            ChainState::Linking { .. } => self.links.len() + 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.state == ChainState::NotStarted
    }

    /// Closes the chain. The tail's DOUT stays unconnected.
    pub fn finish(self) -> ChainWiring {
        let (head, tail) = match self.state {
            ChainState::NotStarted => (None, None),
            ChainState::Linking { head, tail } => (Some(head), Some(tail)),
        };
        ChainWiring {
            head,
            tail,
            links: self.links,
        }
    }
}

/// Completed chain: `head` DIN is driven by the MCU, `tail` DOUT is left open.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChainWiring {
    pub head: Option<String>,
    pub tail: Option<String>,
    pub links: Vec<ChainLink>,
}

impl ChainWiring {
    pub fn led_count(&self) -> usize {
        match self.head {
            Some(_) => self.links.len() + 1,
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_led_has_no_links() {
        let mut chain = LedChain::new();
        assert!(chain.push("LED1").is_none());
        let wiring = chain.finish();
        assert_eq!(wiring.head.as_deref(), Some("LED1"));
        assert_eq!(wiring.tail.as_deref(), Some("LED1"));
        assert!(wiring.links.is_empty());
        assert_eq!(wiring.led_count(), 1);
    }

    #[test]
    fn links_follow_push_order() {
        let mut chain = LedChain::new();
        chain.push("LED1");
        let link = chain.push("LED2").unwrap();
        assert_eq!(link.upstream, "LED1");
        assert_eq!(link.net_name, "LED2_DIN");
        let link = chain.push("LED3").unwrap();
        assert_eq!(link.upstream, "LED2");
        assert_eq!(chain.len(), 3);
    }

    #[test]
    fn empty_chain_finishes_without_head() {
        let wiring = LedChain::new().finish();
        assert_eq!(wiring, ChainWiring::default());
        assert_eq!(wiring.led_count(), 0);
    }
}
