#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parsing and validation may reject input but must never panic
    if let Ok(cfg) = balancer_config::load_toml(data)
        && cfg.validate().is_ok()
    {
        // A validated config always converts into core settings
        let _: balancer_core::ControllerCfg = (&cfg.controller).into();
        let params: balancer_core::RunParams = (&cfg.runner).into();
        assert!(!params.period.is_zero());
    }
});
