//! In-memory netlist: parts, their pins, and named nets joining them.

use crate::partstore::PartKind;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Part {
    pub reference: String,
    pub value: String,
    pub library: &'static str,
    pub symbol: &'static str,
    pub footprint: String,
    pub kind: PartKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PinRef {
    pub part: String,
    pub pin: String,
}

impl PinRef {
    pub fn new(part: &str, pin: impl ToString) -> Self {
        Self {
            part: part.to_string(),
            pin: pin.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Net {
    pub name: String,
    pub nodes: Vec<PinRef>,
}

impl Net {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

pub type NetId = usize;

/// Parts and nets in creation order. A pin belongs to at most one net;
/// connecting a pin that already sits on another net merges the two.
#[derive(Debug, Default)]
pub struct Schematic {
    parts: Vec<Part>,
    nets: Vec<Net>,
    by_name: HashMap<String, NetId>,
    pin_nets: HashMap<PinRef, NetId>,
}

impl Schematic {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_part(&mut self, part: Part) {
        debug!("schematic: add {} ({})", part.reference, part.value);
        self.parts.push(part);
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn part(&self, reference: &str) -> Option<&Part> {
        self.parts.iter().find(|p| p.reference == reference)
    }

    pub fn nets(&self) -> &[Net] {
        &self.nets
    }

    /// Returns the net called `name`, creating an empty one if needed.
    pub fn net(&mut self, name: &str) -> NetId {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        let id = self.nets.len();
        self.nets.push(Net {
            name: name.to_string(),
            nodes: Vec::new(),
        });
        self.by_name.insert(name.to_string(), id);
        id
    }

    pub fn find_net(&self, name: &str) -> Option<&Net> {
        self.by_name.get(name).map(|&id| &self.nets[id])
    }

    pub fn net_of(&self, part: &str, pin: impl ToString) -> Option<&Net> {
        self.pin_nets
            .get(&PinRef::new(part, pin))
            .map(|&id| &self.nets[id])
    }

    pub fn connect(&mut self, net: NetId, part: &str, pin: impl ToString) {
        let pin_ref = PinRef::new(part, pin);
        match self.pin_nets.get(&pin_ref).copied() {
            Some(existing) if existing == net => {}
            Some(existing) => self.merge(net, existing),
            None => {
                self.nets[net].nodes.push(pin_ref.clone());
                self.pin_nets.insert(pin_ref, net);
            }
        }
    }

    /// Shorthand for `connect(net(name), ..)`.
    pub fn connect_named(&mut self, name: &str, part: &str, pin: impl ToString) -> NetId {
        let id = self.net(name);
        self.connect(id, part, pin);
        id
    }

    /// Moves every node of `from` onto `into`; `from` keeps its name but is left empty.
    fn merge(&mut self, into: NetId, from: NetId) {
        debug!(
            "schematic: merging net {} into {}",
            self.nets[from].name, self.nets[into].name
        );
        let nodes = std::mem::take(&mut self.nets[from].nodes);
        for node in nodes {
            self.pin_nets.insert(node.clone(), into);
            self.nets[into].nodes.push(node);
        }
    }

    /// Drops nets with no nodes. Surviving nets keep their names and order.
    pub fn prune_empty_nets(&mut self) -> Vec<String> {
        let (kept, dropped): (Vec<Net>, Vec<Net>) =
            std::mem::take(&mut self.nets).into_iter().partition(|n| !n.is_empty());

        self.nets = kept;
        self.by_name.clear();
        self.pin_nets.clear();
        for (id, net) in self.nets.iter().enumerate() {
            self.by_name.insert(net.name.clone(), id);
            for node in &net.nodes {
                self.pin_nets.insert(node.clone(), id);
            }
        }

        let dropped: Vec<String> = dropped.into_iter().map(|n| n.name).collect();
        if !dropped.is_empty() {
            debug!("schematic: pruned empty nets {:?}", dropped);
        }
        dropped
    }
}
