//! Topic to handler dispatch table

use crate::protocol::TopicSet;
use std::collections::HashMap;

/// Handler selected for an inbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    SetState,
    GetState,
}

/// Routes inbound topics to control actions
#[derive(Debug, Clone)]
pub struct Dispatcher {
    routes: HashMap<String, ControlAction>,
}

impl Dispatcher {
    pub fn new(topics: &TopicSet) -> Self {
        let mut routes = HashMap::new();
        routes.insert(topics.set.clone(), ControlAction::SetState);
        if let Some(get) = &topics.get {
            routes.insert(get.clone(), ControlAction::GetState);
        }
        Self { routes }
    }

    pub fn route(&self, topic: &str) -> Option<ControlAction> {
        self.routes.get(topic).copied()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ProtocolVariant;

    #[test]
    fn test_word_routes() {
        let dispatcher = Dispatcher::new(&ProtocolVariant::Word.default_topics("bedroom/lamp"));
        assert_eq!(dispatcher.len(), 2);
        assert_eq!(
            dispatcher.route("bedroom/lamp/setState"),
            Some(ControlAction::SetState)
        );
        assert_eq!(
            dispatcher.route("bedroom/lamp/getState"),
            Some(ControlAction::GetState)
        );
        // Report topic is publish-only
        assert_eq!(dispatcher.route("bedroom/lamp/state"), None);
    }

    #[test]
    fn test_boolean_routes() {
        let dispatcher =
            Dispatcher::new(&ProtocolVariant::Boolean.default_topics("bedroom/lamp"));
        assert_eq!(dispatcher.len(), 1);
        assert_eq!(
            dispatcher.route("bedroom/lamp/setOn"),
            Some(ControlAction::SetState)
        );
        assert_eq!(dispatcher.route("bedroom/lamp/on"), None);
        assert_eq!(dispatcher.route("bedroom/lamp/online"), None);
    }

    #[test]
    fn test_unknown_topic() {
        let dispatcher =
            Dispatcher::new(&ProtocolVariant::Minimal.default_topics("bedroom/lamp"));
        assert!(!dispatcher.is_empty());
        assert_eq!(dispatcher.route("kitchen/lamp/setState"), None);
    }
}
