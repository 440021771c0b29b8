// Valuation benchmarks for the priced vault.
//
// Every deposit re-prices every non-empty reserve, so deposit cost grows
// with the number of registered assets that hold funds. These benchmarks
// measure that growth.

use chrono::Utc;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;

use custodia_contracts::{MockPriceFeed, MockToken, PricedVault, VaultConfig};
use custodia_protocol::config::{NATIVE_UNIT, REFERENCE_UNIT};
use custodia_protocol::{Address, Host};

/// Builds a vault with `n` registered tokens, each holding a small reserve.
fn setup_vault(n: usize) -> (Arc<PricedVault>, Address) {
    let host = Arc::new(Host::with_system_clock());
    let owner = Address::derive("owner");
    let depositor = Address::derive("depositor");
    let vault_addr = Address::derive("vault");

    let native_feed = Address::derive("feed:native");
    host.deploy_feed(
        native_feed,
        Arc::new(MockPriceFeed::new("ETH / USD", 8, 2_000_00000000, Utc::now())),
    );
    host.native()
        .credit(&depositor, 1_000_000 * NATIVE_UNIT)
        .expect("credit");

    let vault = Arc::new(
        PricedVault::new(
            host.clone(),
            VaultConfig {
                address: vault_addr,
                owner,
                native_feed,
                bank_cap: u128::MAX / 4,
            },
        )
        .expect("vault"),
    );

    for i in 0..n {
        let token_addr = Address::derive(&format!("token:{i}"));
        let feed_addr = Address::derive(&format!("feed:{i}"));
        let token = Arc::new(MockToken::new(&format!("T{i}"), 6));
        token.mint(&depositor, 1_000_000_000).expect("mint");
        token.approve(&depositor, &vault_addr, 1_000_000_000);
        host.deploy_token(token_addr, token);
        host.deploy_feed(
            feed_addr,
            Arc::new(MockPriceFeed::new("T / USD", 8, 1_00000000, Utc::now())),
        );
        vault
            .register_asset(&owner, token_addr, feed_addr)
            .expect("register");
        vault
            .deposit_asset(&depositor, token_addr, 1_000_000)
            .expect("seed reserve");
    }

    (vault, depositor)
}

fn bench_total_valuation(c: &mut Criterion) {
    let mut group = c.benchmark_group("vault/total_valuation");

    for n in [0usize, 8, 64, 256] {
        let (vault, _) = setup_vault(n);
        let owner = vault.owner();
        group.throughput(Throughput::Elements(n as u64 + 1));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| vault.total_valuation(&owner).expect("valuation"));
        });
    }

    group.finish();
}

fn bench_deposit(c: &mut Criterion) {
    let mut group = c.benchmark_group("vault/deposit_native");

    for n in [0usize, 8, 64] {
        let (vault, depositor) = setup_vault(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                vault
                    .deposit_native(&depositor, NATIVE_UNIT / 1_000)
                    .expect("deposit")
            });
        });
    }

    group.finish();
}

fn bench_preview(c: &mut Criterion) {
    let (vault, _) = setup_vault(0);
    c.bench_function("vault/preview_reference_value", |b| {
        b.iter(|| {
            vault
                .preview_reference_value(&custodia_protocol::AssetId::Native, REFERENCE_UNIT)
                .expect("preview")
        });
    });
}

criterion_group!(benches, bench_total_valuation, bench_deposit, bench_preview);
criterion_main!(benches);
