//! Unit tests for ut-sim.

// ── Helpers ───────────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod helpers {
    use std::collections::BTreeMap;

    use ut_core::{AgentId, AgentRng, NavConfig, NodeId, RoadConfig, Vec3};
    use ut_nav::{
        Autopilot, CollisionProbe, DriveCommand, NavError, NavResult, Placement, TickOutcome, VehicleBody, VehiclePose,
    };
    use ut_road::{RoadGraphCompiler, RoadNetwork};

    use crate::{RemovalReason, TrafficHost, TrafficObserver};

    /// Port ─ Normal ─ Normal ─ Port along +X, 15000 long.
    pub const LONG: &str = "\
1,1,0,0,0,300,1,1
2,2,5000,0,0
2,3,10000,0,0
1,-1,15000,0,0,300,1,1
break
";

    /// `LONG` plus an unconnected copy 50000 to the north.
    pub const TWO_TOWNS: &str = "\
1,1,0,0,0,300,1,1
2,2,5000,0,0
2,3,10000,0,0
1,-1,15000,0,0,300,1,1
break
1,1,0,50000,0,300,1,1
2,2,5000,50000,0
2,3,10000,50000,0
1,-1,15000,50000,0,300,1,1
break
";

    /// `LONG` with every lane running towards +X.
    pub const ONE_WAY: &str = "\
1,1,0,0,0,300,1,0
2,2,5000,0,0
2,3,10000,0,0
1,-1,15000,0,0,300,0,1
break
";

    /// Two roads joined at x = 10000 / 10050.  The second one's normal
    /// nodes sit 14000 and 15000 from the first road's normal node.
    pub const CAPPED: &str = "\
1,1,0,0,0,300,1,1
2,2,5000,0,0
1,-1,10000,0,0,300,1,1
break
1,1,10050,0,0,300,1,1
2,2,19050,0,0
2,3,20050,0,0
1,-1,30000,0,0,300,1,1
break
";

    /// West road ─ two-port crossing at the origin ─ east road.
    pub const THROUGH_CROSSING: &str = "\
1,1,-12000,0,0,300,1,1
2,2,-7000,0,0
1,-1,-2050,0,0,300,1,1
break
3,-1,0,0,0
1,0,-2000,0,0,300,1,1
1,0,2000,0,0,300,1,1
break
1,1,2050,0,0,300,1,1
2,2,7000,0,0
1,-1,12000,0,0,300,1,1
break
";

    /// Road A from the origin to x = 6000, road B looping back from its far
    /// end to its start.  B's middle node is 1000 from one end and about
    /// 6124 from the other.
    pub const LOOP: &str = "\
1,1,0,0,0,300,1,1
2,2,3000,0,0
1,-1,6000,0,0,300,1,1
break
1,1,6050,0,0,300,1,1
2,2,6050,1000,0
1,-1,0,50,0,300,1,1
break
";

    pub fn network(data: &str) -> RoadNetwork {
        RoadGraphCompiler::compile_str(RoadConfig::default(), "test", data).0
    }

    /// Record node nearest to `(x, y)` on the ground.
    pub fn node_at(net: &RoadNetwork, x: f32, y: f32) -> NodeId {
        net.nearest_node(Vec3::new(x, y, 0.0)).unwrap()
    }

    pub fn heading_east(x: f32, y: f32) -> VehiclePose {
        VehiclePose::new(Vec3::new(x, y, 0.0), Vec3::X, 0.0)
    }

    pub fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 0.1
    }

    /// Static world: vehicles stay where they were spawned and rays never
    /// hit.
    #[derive(Default)]
    pub struct MockHost {
        pub reference: Option<VehiclePose>,
        pub vehicles: BTreeMap<AgentId, VehiclePose>,
        pub commands: Vec<(AgentId, DriveCommand)>,
        pub destroyed: Vec<AgentId>,
        pub spawn_calls: usize,
        pub refuse: bool,
    }

    impl MockHost {
        pub fn at(reference: VehiclePose) -> Self {
            Self { reference: Some(reference), ..Self::default() }
        }
    }

    impl TrafficHost for MockHost {
        fn reference_pose(&self) -> Option<VehiclePose> {
            self.reference
        }

        fn spawn_vehicle(&mut self, agent: AgentId, _node: NodeId, pose: &VehiclePose) -> Option<VehicleBody> {
            self.spawn_calls += 1;
            if self.refuse {
                return None;
            }
            self.vehicles.insert(agent, *pose);
            Some(VehicleBody::default())
        }

        fn destroy_vehicle(&mut self, agent: AgentId) {
            self.vehicles.remove(&agent);
            self.destroyed.push(agent);
        }

        fn pose(&self, agent: AgentId) -> Option<VehiclePose> {
            self.vehicles.get(&agent).copied()
        }

        fn trace(&mut self, _agent: AgentId, _start: Vec3, _end: Vec3) -> Option<f32> {
            None
        }

        fn apply_command(&mut self, agent: AgentId, command: &DriveCommand) {
            self.commands.push((agent, *command));
        }
    }

    #[derive(Default)]
    pub struct Recorder {
        pub control_ticks: usize,
        pub spawned: Vec<AgentId>,
        pub removed: Vec<(AgentId, RemovalReason)>,
    }

    impl Recorder {
        pub fn removed_for(&self, reason: RemovalReason) -> usize {
            self.removed.iter().filter(|(_, r)| *r == reason).count()
        }
    }

    impl TrafficObserver for Recorder {
        fn on_control_tick(&mut self, _tick: ut_core::Tick, _volume: usize, _vehicles: usize) {
            self.control_ticks += 1;
        }

        fn on_vehicle_spawned(&mut self, agent: AgentId, _node: NodeId) {
            self.spawned.push(agent);
        }

        fn on_vehicle_removed(&mut self, agent: AgentId, reason: RemovalReason) {
            self.removed.push((agent, reason));
        }
    }

    /// Autopilot whose road always ends immediately.
    pub struct Stranded {
        node: NodeId,
    }

    impl Autopilot for Stranded {
        fn bind(
            _agent: AgentId,
            _net: &RoadNetwork,
            _config: &NavConfig,
            placement: &Placement,
            _rng: AgentRng,
        ) -> NavResult<Self> {
            Ok(Self { node: placement.node })
        }

        fn advance<P: CollisionProbe + ?Sized>(
            &mut self,
            _net: &RoadNetwork,
            _dt: f32,
            _pose: &VehiclePose,
            _probe: &mut P,
        ) -> TickOutcome {
            TickOutcome::Terminated
        }

        fn previous_node(&self) -> NodeId {
            self.node
        }

        fn is_inverted(&self) -> bool {
            false
        }
    }

    /// Autopilot that never accepts its placement.
    pub struct Unroutable;

    impl Autopilot for Unroutable {
        fn bind(
            _agent: AgentId,
            _net: &RoadNetwork,
            _config: &NavConfig,
            placement: &Placement,
            _rng: AgentRng,
        ) -> NavResult<Self> {
            Err(NavError::NotOnSegment(placement.node))
        }

        fn advance<P: CollisionProbe + ?Sized>(
            &mut self,
            _net: &RoadNetwork,
            _dt: f32,
            _pose: &VehiclePose,
            _probe: &mut P,
        ) -> TickOutcome {
            TickOutcome::Terminated
        }

        fn previous_node(&self) -> NodeId {
            NodeId::INVALID
        }

        fn is_inverted(&self) -> bool {
            false
        }
    }
}

// ── Spawn volume ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod volume {
    use ut_core::{NodeId, SpawnConfig};

    use super::helpers::*;
    use crate::SpawnVolume;

    const CAP: f32 = 15_000.0;

    #[test]
    fn origin_at_zero_and_unconnected_ports_skipped() {
        let net = network(LONG);
        let origin = node_at(&net, 5000.0, 0.0);
        let volume = SpawnVolume::compute(&net, origin, CAP);
        assert_eq!(volume.origin(), origin);
        assert_eq!(volume.distance(origin), Some(0.0));
        assert_eq!(volume.len(), 2);
        assert!(close(volume.distance(node_at(&net, 10000.0, 0.0)).unwrap(), 5000.0));
        assert!(!volume.contains(node_at(&net, 0.0, 0.0)));
        assert!(!volume.contains(node_at(&net, 15000.0, 0.0)));
    }

    #[test]
    fn ports_are_replaced_by_their_partner() {
        let net = network(CAPPED);
        let origin = node_at(&net, 5000.0, 0.0);
        let volume = SpawnVolume::compute(&net, origin, CAP);
        // The near end of the second road, reached for the length of the
        // link to the first road's own port.
        let partner = node_at(&net, 10050.0, 0.0);
        assert!(close(volume.distance(partner).unwrap(), 5000.0));
        assert!(!volume.contains(node_at(&net, 10000.0, 0.0)));
    }

    #[test]
    fn straight_links_stop_at_the_cap() {
        let net = network(CAPPED);
        let volume = SpawnVolume::compute(&net, node_at(&net, 5000.0, 0.0), CAP);
        assert!(close(volume.distance(node_at(&net, 19050.0, 0.0)).unwrap(), 14000.0));
        // Exactly 15000 away: not below the cap.
        assert!(!volume.contains(node_at(&net, 20050.0, 0.0)));
        assert!(!volume.contains(node_at(&net, 30000.0, 0.0)));
    }

    #[test]
    fn crossings_are_free() {
        let net = network(THROUGH_CROSSING);
        let volume = SpawnVolume::compute(&net, node_at(&net, -7000.0, 0.0), CAP);
        let west_entry = node_at(&net, -2000.0, 0.0);
        let east_exit = node_at(&net, 2050.0, 0.0);
        assert!(close(volume.distance(west_entry).unwrap(), 4950.0));
        // 4000 further along the road, same distance.
        assert_eq!(volume.distance(east_exit), volume.distance(west_entry));
        assert!(close(volume.distance(node_at(&net, 7000.0, 0.0)).unwrap(), 9900.0));
        assert!(!volume.contains(node_at(&net, 0.0, 0.0)));
    }

    #[test]
    fn first_reach_wins_over_a_shorter_route() {
        let net = network(LOOP);
        let volume = SpawnVolume::compute(&net, node_at(&net, 3000.0, 0.0), CAP);
        let middle = node_at(&net, 6050.0, 1000.0);
        let far_link = net.node(middle).position.distance(net.node(node_at(&net, 0.0, 50.0)).position);
        // Reached from the loop's far end first, although its near end is
        // only 4000 away.
        assert!(close(volume.distance(middle).unwrap(), 3000.0 + far_link));
        assert!(volume.distance(middle).unwrap() > 9000.0);
    }

    #[test]
    fn each_node_visited_once() {
        let net = network(LOOP);
        let volume = SpawnVolume::compute(&net, node_at(&net, 3000.0, 0.0), CAP);
        let mut nodes = volume.nodes().to_vec();
        nodes.sort();
        nodes.dedup();
        assert_eq!(nodes.len(), volume.len());
    }

    #[test]
    fn unknown_origin_gives_empty_volume() {
        let net = network(LONG);
        let volume = SpawnVolume::compute(&net, NodeId(999), CAP);
        assert!(volume.is_empty());
    }

    #[test]
    fn spawnable_nodes_filter() {
        let net = network(LONG);
        let cfg = SpawnConfig::default();
        let origin = node_at(&net, 5000.0, 0.0);
        let volume = SpawnVolume::compute(&net, origin, CAP);

        let initial = volume.spawnable_nodes(&net, &cfg, true);
        assert_eq!(initial, vec![origin, node_at(&net, 10000.0, 0.0)]);

        // Later refreshes keep clear of the origin.
        let later = volume.spawnable_nodes(&net, &cfg, false);
        assert_eq!(later, vec![node_at(&net, 10000.0, 0.0)]);
    }

    #[test]
    fn nodes_near_ports_are_not_spawnable() {
        // Normal nodes 500 from either end.
        let net = network("1,1,0,0,0,300,1,1\n2,2,500,0,0\n2,3,1000,0,0\n1,-1,1500,0,0,300,1,1\nbreak\n");
        let volume = SpawnVolume::compute(&net, node_at(&net, 500.0, 0.0), CAP);
        assert_eq!(volume.len(), 2);
        assert!(volume.spawnable_nodes(&net, &SpawnConfig::default(), true).is_empty());
    }
}

// ── Builder ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod builder {
    use ut_core::TrafficConfig;

    use super::helpers::*;
    use crate::{NoopObserver, SimError, TrafficManager, TrafficManagerBuilder};

    #[test]
    fn builds_with_defaults() {
        let traffic: TrafficManager<MockHost> =
            TrafficManagerBuilder::new(TrafficConfig::default(), MockHost::default()).build().unwrap();
        assert!(traffic.network().is_empty());
        assert_eq!(traffic.vehicle_count(), 0);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = TrafficConfig::default();
        config.spawn.volume_cap = -1.0;
        let result = TrafficManagerBuilder::new(config, MockHost::default()).build();
        assert!(matches!(result, Err(SimError::Core(_))));
    }

    #[test]
    fn zero_spawn_attempts_is_rejected() {
        let mut config = TrafficConfig::default();
        config.spawn.attempts_per_vehicle = 0;
        let result = TrafficManagerBuilder::new(config, MockHost::default()).build();
        assert!(matches!(result, Err(SimError::Config(_))));
    }

    #[test]
    fn empty_network_never_spawns() {
        let host = MockHost::at(heading_east(0.0, 0.0));
        let mut traffic = TrafficManagerBuilder::new(TrafficConfig::default(), host).build().unwrap();
        traffic.begin(&mut NoopObserver);
        traffic.step(5.0, &mut NoopObserver);
        assert_eq!(traffic.vehicle_count(), 0);
        assert_eq!(traffic.host().spawn_calls, 0);
    }
}

// ── Population control ────────────────────────────────────────────────────────

#[cfg(test)]
mod population {
    use ut_core::TrafficConfig;
    use ut_nav::NavState;

    use ut_nav::NavError;

    use super::helpers::*;
    use crate::{NoopObserver, RemovalReason, SimError, TrafficHost, TrafficManager, TrafficManagerBuilder};

    fn manager(data: &str, host: MockHost) -> TrafficManager<MockHost> {
        TrafficManagerBuilder::new(TrafficConfig::default(), host)
            .network(network(data))
            .build()
            .unwrap()
    }

    #[test]
    fn begin_fills_to_segment_capacity() {
        let mut traffic = manager(LONG, MockHost::at(heading_east(5000.0, 0.0)));
        let mut rec = Recorder::default();
        traffic.begin(&mut rec);

        let origin = node_at(traffic.network(), 5000.0, 0.0);
        let capacity = traffic.network().max_vehicles(traffic.network().node(origin).segment, 5) as usize;
        assert_eq!(capacity, 10);
        assert_eq!(traffic.vehicle_count(), capacity);
        assert_eq!(rec.spawned.len(), capacity);
        assert_eq!(rec.control_ticks, 1);
        assert_eq!(traffic.volume().origin(), origin);
    }

    #[test]
    fn spawned_vehicles_face_their_lane() {
        let mut traffic = manager(LONG, MockHost::at(heading_east(5000.0, 0.0)));
        traffic.begin(&mut Recorder::default());
        for (id, agent) in traffic.agents() {
            let pose = traffic.host().pose(id).unwrap();
            let expected = if agent.is_inverted() { -1.0 } else { 1.0 };
            assert!(close(pose.forward.x, expected));
            // Lane 0 centre: half a lane right of the axis.
            assert!(close(pose.position.y, expected * 150.0));
            assert_eq!(agent.state(), NavState::Cruising);
        }
    }

    #[test]
    fn step_drives_every_vehicle() {
        let mut traffic = manager(LONG, MockHost::at(heading_east(5000.0, 0.0)));
        let mut rec = Recorder::default();
        traffic.begin(&mut rec);
        traffic.step(0.1, &mut rec);

        let count = traffic.vehicle_count();
        assert_eq!(traffic.host().commands.len(), count);
        // Parked on their own first target: the first tick only pulls the
        // next node.
        assert!(traffic.host().commands.iter().all(|(_, c)| c.throttle == 0.0 && c.steering == 0.0));
        assert_eq!(rec.control_ticks, 1);
    }

    #[test]
    fn vehicles_outside_the_volume_are_culled() {
        let mut traffic = manager(TWO_TOWNS, MockHost::at(heading_east(5000.0, 0.0)));
        let mut rec = Recorder::default();
        traffic.begin(&mut rec);
        let first_wave = traffic.vehicle_count();
        assert_eq!(first_wave, 10);

        traffic.host_mut().reference = Some(heading_east(5000.0, 50000.0));
        traffic.step(2.0, &mut rec);

        assert_eq!(rec.removed_for(RemovalReason::OutOfVolume), first_wave);
        assert_eq!(traffic.host().destroyed.len(), first_wave);
        assert!(traffic.vehicle_count() > 0);
        for (_, agent) in traffic.agents() {
            let node = traffic.network().node(agent.previous_node());
            assert!(close(node.position.y, 50000.0));
            // Later spawns keep off the reference vehicle's direction.
            assert!(agent.is_inverted());
            // And clear of the origin.
            assert!(close(node.position.x, 10000.0));
        }
    }

    #[test]
    fn spawn_attempts_are_bounded() {
        // Every draw lands on the reference vehicle's segment and direction.
        let mut traffic = manager(ONE_WAY, MockHost::at(heading_east(5000.0, 0.0)));
        let mut rec = Recorder::default();
        traffic.refresh_population(false, &mut rec);
        assert_eq!(traffic.vehicle_count(), 0);
        assert_eq!(traffic.host().spawn_calls, 0);
        assert_eq!(rec.control_ticks, 1);
    }

    #[test]
    fn refused_spawns_leave_no_controller() {
        let host = MockHost { refuse: true, ..MockHost::at(heading_east(5000.0, 0.0)) };
        let mut traffic = manager(LONG, host);
        traffic.begin(&mut Recorder::default());
        assert_eq!(traffic.vehicle_count(), 0);
        assert_eq!(traffic.host().spawn_calls, 10);
    }

    #[test]
    fn no_reference_leaves_population_alone() {
        let mut traffic = manager(LONG, MockHost::default());
        traffic.begin(&mut Recorder::default());
        assert_eq!(traffic.vehicle_count(), 0);
        assert!(traffic.volume().is_empty());
    }

    #[test]
    fn vanished_vehicles_are_dropped_without_destroy() {
        let mut traffic = manager(LONG, MockHost::at(heading_east(5000.0, 0.0)));
        let mut rec = Recorder::default();
        traffic.begin(&mut rec);
        let (gone, _) = traffic.agents().next().unwrap();
        traffic.host_mut().vehicles.remove(&gone);

        traffic.step(0.1, &mut rec);
        assert!(traffic.agent(gone).is_none());
        assert_eq!(rec.removed, vec![(gone, RemovalReason::Vanished)]);
        assert!(traffic.host().destroyed.is_empty());
    }

    #[test]
    fn exhausted_paths_are_removed() {
        let mut traffic = TrafficManagerBuilder::new(TrafficConfig::default(), MockHost::at(heading_east(5000.0, 0.0)))
            .network(network(LONG))
            .autopilot::<Stranded>()
            .build()
            .unwrap();
        let mut rec = Recorder::default();
        traffic.begin(&mut rec);
        assert_eq!(traffic.vehicle_count(), 10);

        traffic.step(0.1, &mut rec);
        assert_eq!(traffic.vehicle_count(), 0);
        assert_eq!(rec.removed_for(RemovalReason::PathExhausted), 10);
        assert_eq!(traffic.host().destroyed.len(), 10);
        assert!(traffic.host().vehicles.is_empty());
    }

    #[test]
    fn unbindable_vehicles_are_destroyed_again() {
        let mut traffic = TrafficManagerBuilder::new(TrafficConfig::default(), MockHost::at(heading_east(5000.0, 0.0)))
            .network(network(LONG))
            .autopilot::<Unroutable>()
            .build()
            .unwrap();
        let mut rec = Recorder::default();
        traffic.begin(&mut rec);
        assert_eq!(traffic.vehicle_count(), 0);
        assert!(rec.spawned.is_empty());
        assert_eq!(traffic.host().spawn_calls, 10);
        assert_eq!(traffic.host().destroyed.len(), 10);
        assert!(traffic.host().vehicles.is_empty());
    }

    #[test]
    fn bind_failure_is_a_navigation_error() {
        let mut traffic = TrafficManagerBuilder::new(TrafficConfig::default(), MockHost::default())
            .network(network(LONG))
            .autopilot::<Unroutable>()
            .build()
            .unwrap();
        let node = node_at(traffic.network(), 5000.0, 0.0);
        let segment = traffic.network().node(node).segment;
        let port = traffic.network().entry_ports(segment)[0];

        let result = traffic.spawn_at(node, port, false, &mut NoopObserver);
        assert!(matches!(result, Err(SimError::Nav(NavError::NotOnSegment(n))) if n == node));
        assert_eq!(traffic.host().destroyed.len(), 1);
    }

    #[test]
    fn refused_spawn_is_not_an_error() {
        let mut host = MockHost::default();
        host.refuse = true;
        let mut traffic = manager(LONG, host);
        let node = node_at(traffic.network(), 5000.0, 0.0);
        let segment = traffic.network().node(node).segment;
        let port = traffic.network().entry_ports(segment)[0];

        assert!(matches!(traffic.spawn_at(node, port, false, &mut NoopObserver), Ok(false)));
        assert!(traffic.host().destroyed.is_empty());
    }

    #[test]
    fn rebuild_replaces_every_vehicle() {
        let mut traffic = manager(LONG, MockHost::at(heading_east(5000.0, 0.0)));
        let mut rec = Recorder::default();
        traffic.begin(&mut rec);
        let old: Vec<_> = traffic.agents().map(|(id, _)| id).collect();

        traffic.rebuild(network(LONG), &mut rec);
        assert_eq!(rec.removed_for(RemovalReason::Rebuild), old.len());
        assert_eq!(traffic.vehicle_count(), 10);
        assert!(traffic.agents().all(|(id, _)| !old.contains(&id)));
    }

    #[test]
    fn same_seed_same_traffic() {
        let run = || {
            let mut traffic = manager(LONG, MockHost::at(heading_east(5000.0, 0.0)));
            traffic.begin(&mut Recorder::default());
            let placed: Vec<_> = traffic
                .agents()
                .map(|(id, a)| (id, a.previous_node(), a.is_inverted(), a.lane()))
                .collect();
            placed
        };
        assert_eq!(run(), run());
    }
}
