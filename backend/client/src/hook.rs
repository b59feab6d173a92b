//! # Quick Roll Mirror
//!
//! Local copy of one user's quick rolls for a UI to render.
//!
//! ## Requirements
//!
//! - Every operation sets `loading` and clears `error` on entry
//! - A failure sets `error` and leaves the known list as it was
//! - Mutations never patch the list locally, the server reassigns `order` on
//!   delete so a successful mutation is followed by a full fetch
//! - No user id means no request, only an error
//!
//! ## Implementation
//!
//! - State lives in a [`tokio::sync::watch`] channel, subscribers see every
//!   transition including the intermediate `loading = true`
use dice::{NewQuickRoll, ObjectId, QuickRoll, QuickRollPatch};
use tokio::sync::watch;
use tracing::warn;

use crate::{api::QuickRollApi, error::ClientError};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QuickRollState {
    pub quick_rolls: Vec<QuickRoll>,
    pub loading: bool,
    pub error: Option<String>,
}

pub struct QuickRolls<A> {
    api: A,
    user_id: String,
    state: watch::Sender<QuickRollState>,
}

impl<A: QuickRollApi> QuickRolls<A> {
    pub fn new(api: A, user_id: impl Into<String>) -> Self {
        let (state, _) = watch::channel(QuickRollState::default());

        Self {
            api,
            user_id: user_id.into(),
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<QuickRollState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> QuickRollState {
        self.state.borrow().clone()
    }

    pub async fn fetch(&self) -> Result<(), ClientError> {
        self.begin();
        let result = self.load().await;

        self.settle(result)
    }

    pub async fn create(&self, fields: &NewQuickRoll) -> Result<QuickRoll, ClientError> {
        self.begin();
        let result = match self.user() {
            Ok(user_id) => self.api.create(user_id, fields).await,
            Err(e) => Err(e),
        };

        self.resync(result).await
    }

    pub async fn update(
        &self,
        id: &ObjectId,
        patch: &QuickRollPatch,
    ) -> Result<QuickRoll, ClientError> {
        self.begin();
        let result = match self.user() {
            Ok(user_id) => self.api.update(user_id, id, patch).await,
            Err(e) => Err(e),
        };

        self.resync(result).await
    }

    pub async fn delete(&self, id: &ObjectId) -> Result<(), ClientError> {
        self.begin();
        let result = match self.user() {
            Ok(user_id) => self.api.delete(user_id, id).await,
            Err(e) => Err(e),
        };

        self.resync(result).await
    }

    fn user(&self) -> Result<&str, ClientError> {
        if self.user_id.is_empty() {
            return Err(ClientError::MissingUser);
        }

        Ok(&self.user_id)
    }

    fn begin(&self) {
        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });
    }

    async fn load(&self) -> Result<Vec<QuickRoll>, ClientError> {
        let user_id = self.user()?;
        self.api.list(user_id).await
    }

    /// Follows a successful mutation with a fetch, `loading` stays set across both.
    async fn resync<T>(&self, result: Result<T, ClientError>) -> Result<T, ClientError> {
        match result {
            Ok(value) => {
                let list = self.load().await;
                self.settle(list)?;
                Ok(value)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn settle(&self, result: Result<Vec<QuickRoll>, ClientError>) -> Result<(), ClientError> {
        match result {
            Ok(quick_rolls) => {
                self.state.send_modify(|state| {
                    state.quick_rolls = quick_rolls;
                    state.loading = false;
                });
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn fail(&self, error: ClientError) -> ClientError {
        warn!("Quick roll request failed: {error}");

        self.state.send_modify(|state| {
            state.loading = false;
            state.error = Some(error.to_string());
        });

        error
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::Utc;
    use dice::{Category, Color};

    use super::*;

    const USER: &str = "aaaaaaaaaaaaaaaaaaaaaaaa";

    #[derive(Default)]
    struct Inner {
        quick_rolls: Vec<QuickRoll>,
        fail_next: Option<&'static str>,
        calls: Vec<&'static str>,
        seen_loading: Vec<bool>,
        observer: Option<watch::Receiver<QuickRollState>>,
    }

    /// Server stand-in that keeps orders dense like the real one.
    #[derive(Clone, Default)]
    struct FakeApi(Arc<Mutex<Inner>>);

    impl FakeApi {
        fn call(&self, name: &'static str) -> Result<(), ClientError> {
            let mut inner = self.0.lock().unwrap();
            inner.calls.push(name);

            let loading = inner.observer.as_ref().map(|rx| rx.borrow().loading);
            if let Some(loading) = loading {
                inner.seen_loading.push(loading);
            }

            match inner.fail_next.take() {
                Some(message) => Err(ClientError::Api {
                    status: 500,
                    message: message.to_string(),
                }),
                None => Ok(()),
            }
        }

        fn fail_next(&self, message: &'static str) {
            self.0.lock().unwrap().fail_next = Some(message);
        }

        fn calls(&self) -> Vec<&'static str> {
            self.0.lock().unwrap().calls.clone()
        }
    }

    #[async_trait]
    impl QuickRollApi for FakeApi {
        async fn list(&self, _user_id: &str) -> Result<Vec<QuickRoll>, ClientError> {
            self.call("list")?;
            Ok(self.0.lock().unwrap().quick_rolls.clone())
        }

        async fn create(
            &self,
            user_id: &str,
            fields: &NewQuickRoll,
        ) -> Result<QuickRoll, ClientError> {
            self.call("create")?;

            let mut inner = self.0.lock().unwrap();
            let quick_roll = QuickRoll::new(
                ObjectId::generate(),
                ObjectId::parse(user_id).unwrap(),
                fields.clone(),
                inner.quick_rolls.len() as u32,
                Utc::now(),
            );
            inner.quick_rolls.push(quick_roll.clone());

            Ok(quick_roll)
        }

        async fn update(
            &self,
            _user_id: &str,
            id: &ObjectId,
            patch: &QuickRollPatch,
        ) -> Result<QuickRoll, ClientError> {
            self.call("update")?;

            let mut inner = self.0.lock().unwrap();
            let quick_roll = inner
                .quick_rolls
                .iter_mut()
                .find(|q| &q.id == id)
                .unwrap();
            patch.clone().apply(quick_roll, Utc::now());

            Ok(quick_roll.clone())
        }

        async fn delete(&self, _user_id: &str, id: &ObjectId) -> Result<(), ClientError> {
            self.call("delete")?;

            let mut inner = self.0.lock().unwrap();
            inner.quick_rolls.retain(|q| &q.id != id);
            for (order, quick_roll) in inner.quick_rolls.iter_mut().enumerate() {
                quick_roll.order = order as u32;
            }

            Ok(())
        }
    }

    fn fields(name: &str) -> NewQuickRoll {
        NewQuickRoll {
            name: name.to_string(),
            notation: "1d20".to_string(),
            color: Some(Color::Red),
            category: Some(Category::Combat),
        }
    }

    fn observed(api: &FakeApi, hook: &QuickRolls<FakeApi>) {
        api.0.lock().unwrap().observer = Some(hook.subscribe());
    }

    #[tokio::test]
    async fn test_fetch_populates_state() {
        let api = FakeApi::default();
        let hook = QuickRolls::new(api.clone(), USER);
        observed(&api, &hook);

        hook.fetch().await.unwrap();

        let state = hook.snapshot();
        assert!(!state.loading);
        assert!(state.error.is_none());
        assert!(state.quick_rolls.is_empty());
        assert_eq!(api.0.lock().unwrap().seen_loading, vec![true]);
    }

    #[tokio::test]
    async fn test_create_and_delete_refetch() {
        let api = FakeApi::default();
        let hook = QuickRolls::new(api.clone(), USER);

        let a = hook.create(&fields("A")).await.unwrap();
        hook.create(&fields("B")).await.unwrap();
        hook.delete(&a.id).await.unwrap();

        assert_eq!(
            api.calls(),
            vec!["create", "list", "create", "list", "delete", "list"]
        );

        let state = hook.snapshot();
        assert_eq!(state.quick_rolls.len(), 1);
        assert_eq!(state.quick_rolls[0].name, "B");
        assert_eq!(state.quick_rolls[0].order, 0);
    }

    #[tokio::test]
    async fn test_update_refetches_merged_record() {
        let api = FakeApi::default();
        let hook = QuickRolls::new(api.clone(), USER);
        let a = hook.create(&fields("A")).await.unwrap();

        let patch = QuickRollPatch {
            name: Some("Greataxe".to_string()),
            ..QuickRollPatch::default()
        };
        let updated = hook.update(&a.id, &patch).await.unwrap();

        assert_eq!(updated.name, "Greataxe");
        assert_eq!(hook.snapshot().quick_rolls[0].name, "Greataxe");
        assert_eq!(hook.snapshot().quick_rolls[0].notation, "1d20");
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_list() {
        let api = FakeApi::default();
        let hook = QuickRolls::new(api.clone(), USER);
        hook.create(&fields("A")).await.unwrap();
        let before = hook.snapshot().quick_rolls;

        api.fail_next("Store unavailable");
        assert!(hook.create(&fields("B")).await.is_err());

        let state = hook.snapshot();
        assert!(!state.loading);
        assert_eq!(state.quick_rolls, before);
        assert!(state.error.unwrap().contains("Store unavailable"));

        // The next operation starts from a clean error.
        hook.fetch().await.unwrap();
        assert!(hook.snapshot().error.is_none());
    }

    #[tokio::test]
    async fn test_missing_user_skips_round_trip() {
        let api = FakeApi::default();
        let hook = QuickRolls::new(api.clone(), "");

        assert!(matches!(hook.fetch().await, Err(ClientError::MissingUser)));
        assert!(matches!(
            hook.create(&fields("A")).await,
            Err(ClientError::MissingUser)
        ));

        assert!(api.calls().is_empty());
        let state = hook.snapshot();
        assert!(!state.loading);
        assert!(state.error.is_some());
    }

    #[tokio::test]
    async fn test_subscribers_see_loading_transitions() {
        let api = FakeApi::default();
        let hook = QuickRolls::new(api.clone(), USER);
        let mut rx = hook.subscribe();
        rx.mark_unchanged();

        hook.fetch().await.unwrap();

        assert!(rx.has_changed().unwrap());
        assert!(!rx.borrow_and_update().loading);
    }
}
