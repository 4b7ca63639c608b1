// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use crate::engine::receipt::{Receipt, ReceiptStatus};
use crate::errors::ArchiveError;
use crate::packet::Packet;
use crate::traits::{PacketArchive, PacketRecord};

/// In-memory archive keyed by packet id and receipt id.
#[derive(Default)]
pub struct MemoryArchive {
    packets: RwLock<HashMap<String, PacketRecord>>,
    receipts: RwLock<HashMap<String, Receipt>>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn packet_count(&self) -> usize {
        self.packets.read().map(|packets| packets.len()).unwrap_or(0)
    }

    pub fn receipt_count(&self) -> usize {
        self.receipts
            .read()
            .map(|receipts| receipts.len())
            .unwrap_or(0)
    }
}

fn poisoned(error: impl std::fmt::Display) -> ArchiveError {
    ArchiveError::Storage(error.to_string())
}

fn newest_receipts_first(receipts: &mut [Receipt]) {
    receipts.sort_by(|a, b| b.finished_at.cmp(&a.finished_at));
}

#[async_trait]
impl PacketArchive for MemoryArchive {
    async fn save_packet(&self, packet: &Packet) -> Result<PacketRecord, ArchiveError> {
        let mut packets = self.packets.write().map_err(poisoned)?;
        let mut record = PacketRecord::new(packet);
        if let Some(existing) = packets.get(&packet.id) {
            record.created_at = existing.created_at;
            record.last_run_at = existing.last_run_at;
            record.last_status = existing.last_status;
        }
        packets.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn get_packet(&self, id: &str) -> Result<Option<PacketRecord>, ArchiveError> {
        let packets = self.packets.read().map_err(poisoned)?;
        Ok(packets.get(id).cloned())
    }

    async fn list_recent_packets(&self, limit: usize) -> Result<Vec<PacketRecord>, ArchiveError> {
        let packets = self.packets.read().map_err(poisoned)?;
        let mut records: Vec<PacketRecord> = packets.values().cloned().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit);
        Ok(records)
    }

    async fn record_run(
        &self,
        packet_id: &str,
        status: ReceiptStatus,
    ) -> Result<PacketRecord, ArchiveError> {
        let mut packets = self.packets.write().map_err(poisoned)?;
        let record = packets
            .get_mut(packet_id)
            .ok_or_else(|| ArchiveError::PacketNotFound(packet_id.to_string()))?;
        record.last_run_at = Some(Utc::now());
        record.last_status = Some(status);
        Ok(record.clone())
    }

    async fn delete_packet(&self, id: &str) -> Result<bool, ArchiveError> {
        let mut packets = self.packets.write().map_err(poisoned)?;
        Ok(packets.remove(id).is_some())
    }

    async fn save_receipt(&self, receipt: &Receipt) -> Result<(), ArchiveError> {
        let mut receipts = self.receipts.write().map_err(poisoned)?;
        receipts.insert(receipt.receipt_id.clone(), receipt.clone());
        Ok(())
    }

    async fn get_receipt(&self, id: &str) -> Result<Option<Receipt>, ArchiveError> {
        let receipts = self.receipts.read().map_err(poisoned)?;
        Ok(receipts.get(id).cloned())
    }

    async fn list_recent_receipts(&self, limit: usize) -> Result<Vec<Receipt>, ArchiveError> {
        let receipts = self.receipts.read().map_err(poisoned)?;
        let mut listed: Vec<Receipt> = receipts.values().cloned().collect();
        newest_receipts_first(&mut listed);
        listed.truncate(limit);
        Ok(listed)
    }

    async fn list_receipts_for_packet(
        &self,
        packet_id: &str,
    ) -> Result<Vec<Receipt>, ArchiveError> {
        let receipts = self.receipts.read().map_err(poisoned)?;
        let mut listed: Vec<Receipt> = receipts
            .values()
            .filter(|receipt| receipt.packet_id == packet_id)
            .cloned()
            .collect();
        newest_receipts_first(&mut listed);
        Ok(listed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::consts::DEFAULT_RECENT_RECEIPTS;
    use crate::engine::tokens::TokenStats;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn packet(id: &str) -> Packet {
        Packet::from_value(json!({
            "ucp_version": "0.1",
            "id": id,
            "meta": {"name": format!("{} packet", id)},
            "ops": [{"op": "transform.set"}]
        }))
        .unwrap()
    }

    fn receipt(packet_id: &str, minutes: i64) -> Receipt {
        let started = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        Receipt::seal(
            packet_id.to_string(),
            started,
            started + Duration::minutes(minutes),
            Vec::new(),
            "hash".to_string(),
            TokenStats::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_save_and_get_packet() {
        let archive = MemoryArchive::new();
        let record = archive.save_packet(&packet("p1")).await.unwrap();

        assert_eq!(record.name, "p1 packet");
        assert_eq!(archive.get_packet("p1").await.unwrap(), Some(record));
        assert_eq!(archive.get_packet("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_resave_keeps_run_bookkeeping() {
        let archive = MemoryArchive::new();
        let first = archive.save_packet(&packet("p1")).await.unwrap();
        archive
            .record_run("p1", ReceiptStatus::Failed)
            .await
            .unwrap();

        let again = archive.save_packet(&packet("p1")).await.unwrap();
        assert_eq!(again.created_at, first.created_at);
        assert_eq!(again.last_status, Some(ReceiptStatus::Failed));
        assert!(again.last_run_at.is_some());
        assert_eq!(archive.packet_count(), 1);
    }

    #[tokio::test]
    async fn test_record_run_requires_packet() {
        let archive = MemoryArchive::new();
        let err = archive
            .record_run("ghost", ReceiptStatus::Success)
            .await
            .unwrap_err();
        assert_eq!(err, ArchiveError::PacketNotFound("ghost".to_string()));
    }

    #[tokio::test]
    async fn test_delete_packet() {
        let archive = MemoryArchive::new();
        archive.save_packet(&packet("p1")).await.unwrap();
        assert!(archive.delete_packet("p1").await.unwrap());
        assert!(!archive.delete_packet("p1").await.unwrap());
    }

    #[tokio::test]
    async fn test_recent_packets_are_newest_first() {
        let archive = MemoryArchive::new();
        for id in ["a", "b", "c"] {
            archive.save_packet(&packet(id)).await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
        let ids: Vec<String> = archive
            .list_recent_packets(2)
            .await
            .unwrap()
            .into_iter()
            .map(|record| record.id)
            .collect();
        assert_eq!(ids, vec!["c", "b"]);
    }

    #[tokio::test]
    async fn test_receipts_by_recency_and_packet() {
        let archive = MemoryArchive::new();
        let older = receipt("p1", 1);
        let newer = receipt("p1", 5);
        let other = receipt("p2", 3);
        for r in [&older, &newer, &other] {
            archive.save_receipt(r).await.unwrap();
        }

        let recent = archive
            .list_recent_receipts(DEFAULT_RECENT_RECEIPTS)
            .await
            .unwrap();
        assert_eq!(
            recent.iter().map(|r| r.receipt_id.as_str()).collect::<Vec<_>>(),
            vec![
                newer.receipt_id.as_str(),
                other.receipt_id.as_str(),
                older.receipt_id.as_str()
            ]
        );

        let for_p1 = archive.list_receipts_for_packet("p1").await.unwrap();
        assert_eq!(for_p1, vec![newer.clone(), older.clone()]);
        assert_eq!(
            archive.get_receipt(&other.receipt_id).await.unwrap(),
            Some(other)
        );
        assert_eq!(archive.receipt_count(), 3);
    }
}
