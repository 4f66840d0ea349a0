#[cfg(test)]
mod module_contract_tests {
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use crate::{
        context::ModuleCtxBuilder,
        contracts::{HostedModule, RegisterModule, RootLifecycle, RootViewModel, TypedUiModule},
        module_base::{ModuleInfo, UiModuleBase},
        registry::RegistryBuilder,
        RootModelType, UiModule,
    };

    // Test root view-models
    #[derive(Debug)]
    struct Inbox {
        serial: usize,
    }
    impl RootViewModel for Inbox {}

    #[derive(Debug)]
    struct Calendar;
    impl RootViewModel for Calendar {}

    // Counting stub factory
    fn inbox_module(calls: Arc<AtomicUsize>) -> UiModuleBase<Inbox> {
        UiModuleBase::with_factory(ModuleInfo::new("inbox", "Inbox", 20), move || {
            let serial = calls.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Inbox { serial }))
        })
    }

    #[test]
    fn lazy_construction() {
        let calls = Arc::new(AtomicUsize::new(0));
        let module = inbox_module(calls.clone());
        let hosted: &dyn HostedModule = &module;

        // Enumerating and sorting the host view does not touch the factory.
        let _ = (hosted.id(), hosted.name(), hosted.order());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        TypedUiModule::root_view_model(&module).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn memoization_returns_identical_instance() {
        let calls = Arc::new(AtomicUsize::new(0));
        let module = inbox_module(calls.clone());

        let a = module.root_view_model().unwrap();
        let b = module.root_view_model().unwrap();
        let c = module.root_view_model().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&b, &c));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn clear_then_reconstruct() {
        let calls = Arc::new(AtomicUsize::new(0));
        let module = inbox_module(calls.clone());

        let before = module.root_view_model().unwrap();
        RootLifecycle::clear_root(&module);
        let after = module.root_view_model().unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after.serial, 1);
    }

    #[test]
    fn clear_is_idempotent() {
        let calls = Arc::new(AtomicUsize::new(0));
        let module = inbox_module(calls.clone());

        // On an empty slot
        module.clear_root();
        module.clear_root();
        assert!(!module.has_root());

        module.root_view_model().unwrap();
        module.clear_root();
        module.clear_root();
        assert!(!module.has_root());

        module.root_view_model().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn metadata_reads_are_pure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let module = inbox_module(calls.clone());

        for _ in 0..3 {
            assert_eq!(module.id(), "inbox");
            assert_eq!(module.root_model_type(), RootModelType::of::<Inbox>());
            assert_eq!(module.order(), 20);
            assert_eq!(module.name(), "Inbox");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!module.has_root());

        let root = module.root_view_model().unwrap();
        for _ in 0..3 {
            let _ = (module.name(), module.id(), module.order(), module.root_model_type());
        }
        assert!(Arc::ptr_eq(&root, &module.root_view_model().unwrap()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn type_token_matches_runtime_type() {
        let module = inbox_module(Arc::new(AtomicUsize::new(0)));
        let token = TypedUiModule::root_model_type(&module);

        let root = module.root_view_model().unwrap();
        let erased: &dyn Any = &*root;
        assert!(token.matches(erased));
        assert_eq!(token.type_id(), erased.type_id());
        assert_ne!(token, RootModelType::of::<Calendar>());

        // Same answer through the non-generic capability.
        let hosted: &dyn HostedModule = &module;
        assert_eq!(hosted.root_model_type(), token);
    }

    #[test]
    fn ordering_scenario() {
        let mut b = RegistryBuilder::default();
        for (id, order) in [("thirty", 30), ("ten", 10), ("twenty", 20), ("ten-bis", 10)] {
            b.register(Arc::new(UiModuleBase::<Calendar>::with_factory(
                ModuleInfo::new(id, id, order),
                || Ok(Arc::new(Calendar)),
            )));
        }
        let reg = b.build().unwrap();

        let sorted: Vec<(&str, i32)> = reg.modules().iter().map(|m| (m.id(), m.order())).collect();
        assert_eq!(
            sorted,
            vec![("ten", 10), ("ten-bis", 10), ("twenty", 20), ("thirty", 30)]
        );
    }

    #[test]
    fn register_captures_container_before_override() {
        let calls: Arc<Mutex<Vec<String>>> = Arc::default();
        let tracker = calls.clone();
        let module = UiModuleBase::<Inbox>::builder(ModuleInfo::new("inbox", "Inbox", 0))
            .on_register(move |m, ctx| {
                assert!(m.has_resolver(), "container must be captured before the hook");
                tracker.lock().unwrap().push(format!(
                    "override:{}",
                    ctx.current_module().unwrap_or("-")
                ));
                ctx.client_hub()
                    .register_factory::<Inbox, _>(|| Ok(Arc::new(Inbox { serial: 99 })));
                Ok(())
            })
            .build();

        let ctx = ModuleCtxBuilder::new().build().for_module("inbox");
        assert!(!module.has_resolver());
        module.register_module(&ctx).unwrap();

        assert_eq!(*calls.lock().unwrap(), vec!["override:inbox".to_string()]);
        // The root resolves through what the hook registered.
        assert_eq!(module.root_view_model().unwrap().serial, 99);
    }

    #[test]
    fn failed_override_keeps_captured_container() {
        let module = UiModuleBase::<Inbox>::builder(ModuleInfo::new("inbox", "Inbox", 0))
            .on_register(|_, _| Err(anyhow::anyhow!("service already registered")))
            .build();

        let ctx = ModuleCtxBuilder::new().build();
        ctx.client_hub()
            .register::<Inbox>(Arc::new(Inbox { serial: 5 }));

        let err = module.register_module(&ctx).unwrap_err();
        assert_eq!(err.to_string(), "service already registered");
        assert!(module.has_resolver());
        assert_eq!(module.root_view_model().unwrap().serial, 5);
    }

    #[test]
    fn heterogeneous_modules_clear_uniformly() {
        let inbox: Arc<dyn HostedModule> = Arc::new(inbox_module(Arc::new(AtomicUsize::new(0))));
        let calendar: Arc<dyn HostedModule> = Arc::new(UiModuleBase::<Calendar>::with_factory(
            ModuleInfo::new("calendar", "Calendar", 1),
            || Ok(Arc::new(Calendar)),
        ));
        let all = [inbox, calendar];

        for m in &all {
            m.ensure_root().unwrap();
        }
        assert!(all.iter().all(|m| m.has_root()));

        for m in &all {
            m.clear_root();
        }
        assert!(all.iter().all(|m| !m.has_root()));
    }
}
