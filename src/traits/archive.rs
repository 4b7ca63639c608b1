// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::receipt::{Receipt, ReceiptStatus};
use crate::errors::ArchiveError;
use crate::packet::Packet;

/// A stored packet with its run bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PacketRecord {
    pub id: String,
    /// `meta.name` when present, the packet id otherwise
    pub name: String,
    pub packet: Packet,
    pub created_at: DateTime<Utc>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_status: Option<ReceiptStatus>,
}

impl PacketRecord {
    pub fn new(packet: &Packet) -> Self {
        let name = packet
            .meta
            .as_ref()
            .and_then(|meta| meta.get("name"))
            .and_then(|name| name.as_str())
            .unwrap_or(&packet.id)
            .to_string();
        Self {
            id: packet.id.clone(),
            name,
            packet: packet.clone(),
            created_at: Utc::now(),
            last_run_at: None,
            last_status: None,
        }
    }
}

/// Durable packet and receipt storage. The engine writes to it once a
/// receipt is assembled and never reads from it during a run.
#[async_trait]
pub trait PacketArchive: Send + Sync {
    /// Insert or replace a packet, keeping existing run bookkeeping.
    async fn save_packet(&self, packet: &Packet) -> Result<PacketRecord, ArchiveError>;

    async fn get_packet(&self, id: &str) -> Result<Option<PacketRecord>, ArchiveError>;

    /// Most recently created first.
    async fn list_recent_packets(&self, limit: usize) -> Result<Vec<PacketRecord>, ArchiveError>;

    async fn record_run(
        &self,
        packet_id: &str,
        status: ReceiptStatus,
    ) -> Result<PacketRecord, ArchiveError>;

    async fn delete_packet(&self, id: &str) -> Result<bool, ArchiveError>;

    async fn save_receipt(&self, receipt: &Receipt) -> Result<(), ArchiveError>;

    async fn get_receipt(&self, id: &str) -> Result<Option<Receipt>, ArchiveError>;

    /// Most recently finished first.
    async fn list_recent_receipts(&self, limit: usize) -> Result<Vec<Receipt>, ArchiveError>;

    /// Every receipt of one packet, most recent first.
    async fn list_receipts_for_packet(&self, packet_id: &str)
        -> Result<Vec<Receipt>, ArchiveError>;
}
