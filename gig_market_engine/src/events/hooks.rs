use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    EventHandler,
    EventProducer,
    Handler,
    OrderCancelledEvent,
    OrderCompletedEvent,
    OrderLateEvent,
};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_completed_producer: Vec<EventProducer<OrderCompletedEvent>>,
    pub order_cancelled_producer: Vec<EventProducer<OrderCancelledEvent>>,
    pub order_late_producer: Vec<EventProducer<OrderLateEvent>>,
}

pub struct EventHandlers {
    pub on_order_completed: Option<EventHandler<OrderCompletedEvent>>,
    pub on_order_cancelled: Option<EventHandler<OrderCancelledEvent>>,
    pub on_order_late: Option<EventHandler<OrderLateEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_completed = hooks.on_order_completed.map(|f| EventHandler::new(buffer_size, f));
        let on_order_cancelled = hooks.on_order_cancelled.map(|f| EventHandler::new(buffer_size, f));
        let on_order_late = hooks.on_order_late.map(|f| EventHandler::new(buffer_size, f));
        Self { on_order_completed, on_order_cancelled, on_order_late }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_completed {
            result.order_completed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_cancelled {
            result.order_cancelled_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_late {
            result.order_late_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_order_completed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_order_cancelled {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_order_late {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_completed: Option<Handler<OrderCompletedEvent>>,
    pub on_order_cancelled: Option<Handler<OrderCancelledEvent>>,
    pub on_order_late: Option<Handler<OrderLateEvent>>,
}

impl EventHooks {
    pub fn on_order_completed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderCompletedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_completed = Some(Arc::new(f));
        self
    }

    pub fn on_order_cancelled<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderCancelledEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_cancelled = Some(Arc::new(f));
        self
    }

    pub fn on_order_late<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderLateEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_late = Some(Arc::new(f));
        self
    }
}
