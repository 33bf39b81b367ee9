//! Scheduler tick benchmark — cost of the dispatched control pipeline.
//!
//! Every component body is tick-counter based and allocation-free, so a
//! full millisecond tick should sit far below its 1 ms budget even with all
//! three rate groups due. Measures a single worst-case tick (all groups
//! fire at t ≡ 0 mod 20) and a sustained one-second burst with frame
//! injection.

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};

use flm_common::consts::{
    ADC_CHANNEL_AMBIENT, ADC_CHANNEL_CURRENT, E2E_COUNTER_OFFSET_BITS, E2E_CRC_OFFSET_BITS,
    E2E_MAX_DELTA_COUNTER, E2E_MAX_NO_NEW_DATA, LIGHTSWITCH_CMD_BYTE, LIGHTSWITCH_DATA_ID,
    LIGHTSWITCH_FRAME_LEN,
};
use flm_common::hal::{AnalogInput, DigitalOutput};
use flm_control_unit::e2e::{E2eConfig, ProtectState};
use flm_control_unit::sched::Dispatcher;
use flm_hal::{FrameLatch, SimAdc, SimDio};

struct BenchSetup {
    dispatcher: Dispatcher,
    latch: Arc<FrameLatch>,
    protect: ProtectState,
    e2e_config: E2eConfig,
}

fn setup() -> BenchSetup {
    let latch = Arc::new(FrameLatch::new());
    let adc = Arc::new(SimAdc::new());
    let dio = Arc::new(SimDio::new());
    adc.set_value(ADC_CHANNEL_AMBIENT, 2000);
    adc.set_value(ADC_CHANNEL_CURRENT, 500);

    let dispatcher = Dispatcher::new(
        Arc::clone(&latch),
        adc as Arc<dyn AnalogInput>,
        dio as Arc<dyn DigitalOutput>,
    );
    let e2e_config = E2eConfig::new(
        LIGHTSWITCH_DATA_ID,
        LIGHTSWITCH_FRAME_LEN,
        E2E_CRC_OFFSET_BITS,
        E2E_COUNTER_OFFSET_BITS,
        E2E_MAX_DELTA_COUNTER,
        E2E_MAX_NO_NEW_DATA,
    )
    .unwrap();

    BenchSetup {
        dispatcher,
        latch,
        protect: ProtectState::new(),
        e2e_config,
    }
}

fn bench_single_tick(c: &mut Criterion) {
    let mut bench = setup();

    c.bench_function("dispatcher_tick_all_groups", |b| {
        b.iter(|| {
            // Publish a fresh frame so the E2E path runs its full check.
            let mut frame = [0u8; LIGHTSWITCH_FRAME_LEN];
            frame[LIGHTSWITCH_CMD_BYTE] = 1;
            bench.protect.protect(&bench.e2e_config, &mut frame);
            bench.latch.publish(&frame);

            bench.dispatcher.tick();
        });
    });
}

fn bench_one_second_burst(c: &mut Criterion) {
    c.bench_function("dispatcher_1000_ticks", |b| {
        b.iter_batched(
            setup,
            |mut bench| {
                for tick in 0u32..1000 {
                    if tick % 20 == 0 {
                        let mut frame = [0u8; LIGHTSWITCH_FRAME_LEN];
                        frame[LIGHTSWITCH_CMD_BYTE] = 1;
                        bench.protect.protect(&bench.e2e_config, &mut frame);
                        bench.latch.publish(&frame);
                    }
                    bench.dispatcher.tick();
                }
                bench
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_single_tick, bench_one_second_burst);
criterion_main!(benches);
