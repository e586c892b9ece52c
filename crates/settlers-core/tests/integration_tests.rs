//! Integration tests for the settlers engine.
//!
//! These tests drive complete game flows through `Game::apply`, from setup
//! placements to the end-of-round victory check.

use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use settlers_core::*;

fn names(count: usize) -> Vec<String> {
    ["Alice", "Bob", "Carol", "Dave"]
        .iter()
        .take(count)
        .map(|s| s.to_string())
        .collect()
}

/// A game on the fixed board with scripted dice and a known deck
fn scripted_game(count: usize, dice: LoadedDice, deck: Vec<DevCard>) -> Game<LoadedDice> {
    Game::with_parts(
        GameConfig::default(),
        names(count),
        Board::fixed(),
        Deck::from_cards(deck),
        dice,
    )
    .unwrap()
}

/// Run through setup using the first valid placement each time
fn complete_setup<D: Dice>(game: &mut Game<D>) -> Vec<GameEvent> {
    let mut events = Vec::new();
    while matches!(game.phase(), Phase::Setup { .. }) {
        let player = game.current_player();
        let decision = game.valid_decisions(player).into_iter().next().unwrap();
        events.extend(game.apply(player, decision).unwrap());
    }
    events
}

/// Roll for the current player, resolving any robber sequence that follows
fn roll_and_settle<D: Dice>(game: &mut Game<D>) {
    let player = game.current_player();
    game.apply(player, Decision::RollDice).unwrap();
    while let Some(request) = game.pending_request() {
        match request {
            DecisionRequest::Action { .. } => break,
            DecisionRequest::Discard { player, .. } => {
                let decision = game.valid_decisions(player).remove(0);
                game.apply(player, decision).unwrap();
            }
            DecisionRequest::MoveRobber { player } => move_robber_anywhere(game, player),
            DecisionRequest::Steal { player, .. } => {
                game.apply(player, Decision::Steal(None)).unwrap();
            }
            other => panic!("unexpected request {other:?}"),
        }
    }
}

fn move_robber_anywhere<D: Dice>(game: &mut Game<D>, player: PlayerId) {
    let target = game
        .valid_decisions(player)
        .into_iter()
        .find(|d| matches!(d, Decision::MoveRobber(_)))
        .unwrap();
    game.apply(player, target).unwrap();
    if matches!(game.phase(), Phase::Steal { .. }) {
        game.apply(player, Decision::Steal(None)).unwrap();
    }
}

/// Roll and end the turn for the current player
fn pass_turn<D: Dice>(game: &mut Game<D>) -> Vec<GameEvent> {
    roll_and_settle(game);
    let player = game.current_player();
    game.apply(player, Decision::EndTurn).unwrap()
}

fn give_victory_cards<D: Dice>(game: &mut Game<D>, player: PlayerId, count: u32) {
    let p = &mut game.players[player as usize];
    for _ in 0..count {
        p.dev_cards.push(HeldCard {
            card: DevCard::VictoryPoint,
            drawn_on_turn: 0,
        });
    }
    p.victory_points += count;
}

// ==================== Setup ====================

#[test]
fn test_setup_runs_in_snake_order() {
    let mut game = scripted_game(4, LoadedDice::always(2, 3), Vec::new());

    let mut order = Vec::new();
    while let Some(DecisionRequest::SetupPlacement { player, round }) = game.pending_request() {
        order.push((player, round));
        let decision = game.valid_decisions(player).remove(0);
        game.apply(player, decision).unwrap();
    }

    assert_eq!(
        order,
        vec![(0, 1), (1, 1), (2, 1), (3, 1), (3, 2), (2, 2), (1, 2), (0, 2)]
    );
    assert_eq!(game.phase(), &Phase::Roll);
    assert_eq!(game.current_player(), 0);
    assert_eq!(game.turn(), 1);
}

#[test]
fn test_setup_places_two_of_each_and_produces_nothing() {
    let mut game = scripted_game(3, LoadedDice::always(2, 3), Vec::new());
    let events = complete_setup(&mut game);

    assert_eq!(events.last(), Some(&GameEvent::SetupComplete));
    for player in &game.players {
        assert_eq!(game.board.structure_count(player.id, StructureKind::Settlement), 2);
        assert_eq!(game.board.road_count(player.id), 2);
        assert_eq!(player.roads.len(), 2);
        assert_eq!(player.victory_points, 2);
        assert!(player.resources.is_empty());
    }
    assert_eq!(
        game.pending_request(),
        Some(DecisionRequest::RollOrPlayCard { player: 0 })
    );
}

#[test]
fn test_setup_rejects_crowded_and_off_board_spots() {
    let mut game = scripted_game(3, LoadedDice::always(2, 3), Vec::new());
    let first = game.valid_decisions(0).remove(0);
    let Decision::PlaceSetup { settlement, .. } = first else {
        panic!("expected a setup placement");
    };
    game.apply(0, first).unwrap();

    let neighbor = settlement.adjacent_vertices()[0];
    let crowded = Decision::PlaceSetup {
        settlement: neighbor,
        road: neighbor.edges()[0],
    };
    let board_before = game.board.clone();
    let result = game.apply(1, crowded);
    assert!(matches!(
        result,
        Err(GameError::IllegalPlacement(_)) | Err(GameError::OutOfBounds(_))
    ));
    assert_eq!(game.board, board_before);

    let off_board = Decision::PlaceSetup {
        settlement: VertexAddress::north(9, 9),
        road: EdgeAddress::new(9, 9, EdgeOrientation::NorthEast),
    };
    assert!(matches!(game.apply(1, off_board), Err(GameError::OutOfBounds(_))));
    assert_eq!(game.phase(), &Phase::Setup { step: 1 });
    assert_eq!(game.current_player(), 1);
}

// ==================== Production ====================

#[test]
fn test_roll_credits_exactly_what_the_board_produces() {
    for faces in [(2, 3), (4, 4), (6, 4), (1, 2), (5, 6)] {
        let mut game = scripted_game(4, LoadedDice::always(faces.0, faces.1), Vec::new());
        complete_setup(&mut game);

        let expected = game.board.distribute_resources(faces.0 + faces.1);
        let events = game.apply(0, Decision::RollDice).unwrap();

        for player in &game.players {
            let want = expected.get(&player.id).copied().unwrap_or_default();
            assert_eq!(player.resources, want, "faces {faces:?}, player {}", player.id);
        }
        assert_eq!(game.phase(), &Phase::Actions);
        assert_eq!(game.last_roll(), Some(faces));
        assert!(matches!(events[0], GameEvent::DiceRolled { total, .. } if total == faces.0 + faces.1));
    }
}

// ==================== Robber ====================

#[test]
fn test_seven_makes_large_hands_discard_half() {
    let mut game = scripted_game(3, LoadedDice::always(3, 4), Vec::new());
    complete_setup(&mut game);

    game.players[0].resources = ResourceHand::with_amounts(0, 0, 0, 0, 7);
    game.players[1].resources = ResourceHand::with_amounts(2, 2, 2, 2, 0);
    game.players[2].resources = ResourceHand::with_amounts(9, 0, 0, 0, 0);

    game.apply(0, Decision::RollDice).unwrap();
    assert_eq!(
        game.pending_request(),
        Some(DecisionRequest::Discard { player: 1, count: 4 })
    );

    assert_eq!(
        game.apply(0, Decision::Discard(ResourceHand::single(Resource::Grain, 1))),
        Err(GameError::NotYourTurn)
    );
    assert_eq!(
        game.apply(1, Decision::Discard(ResourceHand::single(Resource::Brick, 2))),
        Err(GameError::InvalidDiscard { expected: 4, got: 2 })
    );
    assert_eq!(
        game.apply(1, Decision::Discard(ResourceHand::single(Resource::Lumber, 4))),
        Err(GameError::InsufficientResources)
    );
    assert_eq!(game.players[1].resources.total(), 8);

    game.apply(1, Decision::Discard(ResourceHand::with_amounts(2, 2, 0, 0, 0)))
        .unwrap();
    assert_eq!(game.players[1].resources, ResourceHand::with_amounts(0, 0, 2, 2, 0));
    assert_eq!(
        game.pending_request(),
        Some(DecisionRequest::Discard { player: 2, count: 5 })
    );

    game.apply(2, Decision::Discard(ResourceHand::single(Resource::Brick, 5)))
        .unwrap();
    assert_eq!(game.players[2].resources.total(), 4);
    assert_eq!(game.players[0].resources.total(), 7);
    assert_eq!(
        game.pending_request(),
        Some(DecisionRequest::MoveRobber { player: 0 })
    );
}

#[test]
fn test_robber_must_move_and_steals_by_type() {
    let mut game = scripted_game(3, LoadedDice::always(3, 4), Vec::new());
    complete_setup(&mut game);
    game.players[1].resources = ResourceHand::with_amounts(2, 0, 0, 0, 0);

    game.apply(0, Decision::RollDice).unwrap();
    assert_eq!(game.phase(), &Phase::MoveRobber);

    let robber = game.board.robber_location();
    assert_eq!(
        game.apply(0, Decision::MoveRobber(robber)),
        Err(GameError::InvalidRobberMove(robber.to_string()))
    );

    let target = game
        .board
        .structures()
        .filter(|(_, s)| s.owner == 1)
        .flat_map(|(v, _)| v.tiles())
        .find(|t| game.board.is_land(t) && *t != robber)
        .unwrap();
    let events = game.apply(0, Decision::MoveRobber(target)).unwrap();
    assert_eq!(
        events,
        vec![GameEvent::RobberMoved {
            player: 0,
            from: robber,
            to: target,
        }]
    );
    assert_eq!(
        game.pending_request(),
        Some(DecisionRequest::Steal {
            player: 0,
            victims: vec![1],
        })
    );

    let wrong = StealChoice {
        victim: 2,
        resource: Resource::Brick,
    };
    assert_eq!(
        game.apply(0, Decision::Steal(Some(wrong))),
        Err(GameError::InvalidTarget(2))
    );

    let brick_before = game.players[0].resources.get(Resource::Brick);
    let events = game
        .apply(
            0,
            Decision::Steal(Some(StealChoice {
                victim: 1,
                resource: Resource::Brick,
            })),
        )
        .unwrap();
    assert_eq!(
        events,
        vec![GameEvent::ResourceStolen {
            thief: 0,
            victim: 1,
            resource: Some(Resource::Brick),
        }]
    );
    assert_eq!(game.players[1].resources.get(Resource::Brick), 1);
    assert_eq!(game.players[0].resources.get(Resource::Brick), brick_before + 1);
    assert_eq!(game.phase(), &Phase::Actions);
}

// ==================== Building ====================

#[test]
fn test_city_upgrade() {
    let mut game = scripted_game(3, LoadedDice::always(2, 3), Vec::new());
    complete_setup(&mut game);
    roll_and_settle(&mut game);

    let vertex = game.board.upgradable_settlements(0)[0];
    let opponent = game.board.upgradable_settlements(1)[0];

    game.players[0].resources = ResourceHand::with_amounts(0, 0, 2, 2, 0);
    assert_eq!(
        game.apply(0, Decision::BuildCity(vertex)),
        Err(GameError::InsufficientResources)
    );

    game.players[0].resources = ResourceHand::with_amounts(0, 0, 3, 2, 0);
    assert!(matches!(
        game.apply(0, Decision::BuildCity(opponent)),
        Err(GameError::IllegalPlacement(_))
    ));

    game.apply(0, Decision::BuildCity(vertex)).unwrap();
    assert_eq!(game.board.vertex_at(vertex), Ok(Some(Structure::city(0))));
    assert_eq!(game.players[0].victory_points, 3);
    assert!(game.players[0].resources.is_empty());

    game.players[0].resources = ResourceHand::with_amounts(0, 0, 3, 2, 0);
    assert!(matches!(
        game.apply(0, Decision::BuildCity(vertex)),
        Err(GameError::IllegalPlacement(_))
    ));
}

#[test]
fn test_settlement_needs_a_road_in_the_main_game() {
    let mut game = scripted_game(3, LoadedDice::always(2, 3), Vec::new());
    complete_setup(&mut game);
    roll_and_settle(&mut game);

    let own_roads = game.board.legal_road_spots(0);
    let unconnected = game
        .board
        .legal_structure_spots(0, PlacementMode::Setup)
        .into_iter()
        .find(|v| !v.edges().iter().any(|e| game.board.edge_at(*e) == Ok(Some(Road { owner: 0 }))))
        .unwrap();
    assert!(!own_roads.is_empty());

    game.players[0].resources = costs::settlement();
    let board_before = game.board.clone();
    assert!(matches!(
        game.apply(0, Decision::BuildSettlement(unconnected)),
        Err(GameError::IllegalPlacement(_))
    ));
    assert_eq!(game.board, board_before);
    assert_eq!(game.players[0].resources, costs::settlement());
}

#[test]
fn test_settlement_cap_is_checked_before_placement() {
    let config = GameConfig {
        max_settlements: 2,
        ..GameConfig::default()
    };
    let mut game = Game::with_parts(
        config,
        names(3),
        Board::fixed(),
        Deck::from_cards(Vec::new()),
        LoadedDice::always(2, 3),
    )
    .unwrap();
    complete_setup(&mut game);
    roll_and_settle(&mut game);

    game.players[0].resources = costs::settlement();
    let anywhere = game.board.legal_structure_spots(0, PlacementMode::Setup)[0];
    assert_eq!(
        game.apply(0, Decision::BuildSettlement(anywhere)),
        Err(GameError::CapacityExceeded(Piece::Settlement))
    );
    assert_eq!(game.players[0].resources, costs::settlement());
}

#[test]
fn test_road_cap() {
    let mut game = scripted_game(3, LoadedDice::always(2, 3), Vec::new());
    complete_setup(&mut game);
    roll_and_settle(&mut game);
    game.players[0].resources = ResourceHand::with_amounts(20, 0, 0, 0, 20);

    while game.board.road_count(0) < 15 {
        let edge = game.board.legal_road_spots(0)[0];
        let events = game.apply(0, Decision::BuildRoad(edge)).unwrap();
        assert_eq!(
            events,
            vec![GameEvent::RoadPlaced {
                player: 0,
                location: edge,
                free: false,
            }]
        );
    }
    assert_eq!(game.players[0].roads.len(), 15);
    assert_eq!(game.players[0].resources, ResourceHand::with_amounts(7, 0, 0, 0, 7));

    let edge = game.board.legal_road_spots(0)[0];
    let board_before = game.board.clone();
    assert_eq!(
        game.apply(0, Decision::BuildRoad(edge)),
        Err(GameError::CapacityExceeded(Piece::Road))
    );
    assert_eq!(game.board, board_before);
    assert_eq!(game.players[0].resources, ResourceHand::with_amounts(7, 0, 0, 0, 7));
    assert!(!game
        .valid_decisions(0)
        .iter()
        .any(|d| matches!(d, Decision::BuildRoad(_))));
}

#[test]
fn test_city_cap_is_checked_before_upgrade() {
    let config = GameConfig {
        max_cities: 1,
        ..GameConfig::default()
    };
    let mut game = Game::with_parts(
        config,
        names(3),
        Board::fixed(),
        Deck::from_cards(Vec::new()),
        LoadedDice::always(2, 3),
    )
    .unwrap();
    complete_setup(&mut game);
    roll_and_settle(&mut game);

    let settlements = game.board.upgradable_settlements(0);
    assert_eq!(settlements.len(), 2);
    game.players[0].resources = ResourceHand::with_amounts(0, 0, 6, 4, 0);
    game.apply(0, Decision::BuildCity(settlements[0])).unwrap();
    assert_eq!(game.players[0].resources, costs::city());

    let board_before = game.board.clone();
    assert_eq!(
        game.apply(0, Decision::BuildCity(settlements[1])),
        Err(GameError::CapacityExceeded(Piece::City))
    );
    assert_eq!(game.board, board_before);
    assert_eq!(game.board.vertex_at(settlements[1]), Ok(Some(Structure::settlement(0))));
    assert_eq!(game.players[0].resources, costs::city());
    assert_eq!(game.players[0].victory_points, 3);
    assert!(!game
        .valid_decisions(0)
        .iter()
        .any(|d| matches!(d, Decision::BuildCity(_))));
}

// ==================== Development cards ====================

#[test]
fn test_card_bought_this_turn_is_not_playable() {
    let mut game = scripted_game(
        3,
        LoadedDice::always(2, 3),
        vec![DevCard::Knight, DevCard::VictoryPoint],
    );
    complete_setup(&mut game);
    roll_and_settle(&mut game);

    game.players[0].resources = ResourceHand::with_amounts(0, 2, 2, 2, 0);
    let events = game.apply(0, Decision::BuyDevCard).unwrap();
    assert_eq!(
        events,
        vec![GameEvent::DevCardDrawn {
            player: 0,
            card: DevCard::Knight,
        }]
    );
    assert_eq!(
        game.apply(0, Decision::PlayDevCard(0)),
        Err(GameError::InvalidDevCardSelection(0))
    );
    assert_eq!(
        game.apply(0, Decision::PlayDevCard(4)),
        Err(GameError::InvalidDevCardSelection(4))
    );

    // Victory-point cards count as soon as they are drawn
    game.apply(0, Decision::BuyDevCard).unwrap();
    assert_eq!(game.players[0].victory_points, 3);
    assert!(game.players[0].resources.is_empty());

    game.players[0].resources = costs::development_card();
    assert_eq!(game.apply(0, Decision::BuyDevCard), Err(GameError::DeckExhausted));
    assert_eq!(game.players[0].resources, costs::development_card());

    game.apply(0, Decision::EndTurn).unwrap();
    pass_turn(&mut game);
    pass_turn(&mut game);

    // Next turn the knight is playable, the victory-point card never is
    assert_eq!(game.current_player(), 0);
    assert_eq!(
        game.apply(0, Decision::PlayDevCard(1)),
        Err(GameError::InvalidDevCardSelection(1))
    );
    game.apply(0, Decision::PlayDevCard(0)).unwrap();
    assert_eq!(game.phase(), &Phase::MoveRobber);
    assert_eq!(game.players[0].knights_played, 1);
}

#[test]
fn test_monopoly_takes_every_opponents_stock() {
    let mut game = scripted_game(3, LoadedDice::always(2, 3), Vec::new());
    complete_setup(&mut game);

    game.players[0].dev_cards.push(HeldCard {
        card: DevCard::Monopoly,
        drawn_on_turn: 0,
    });
    game.players[0].resources = ResourceHand::with_amounts(1, 1, 1, 1, 1);
    game.players[1].resources = ResourceHand::with_amounts(0, 2, 3, 0, 0);
    game.players[2].resources = ResourceHand::with_amounts(0, 0, 2, 1, 0);

    game.apply(0, Decision::PlayDevCard(0)).unwrap();
    assert_eq!(
        game.pending_request(),
        Some(DecisionRequest::MonopolyResource { player: 0 })
    );

    let events = game.apply(0, Decision::ClaimMonopoly(Resource::Ore)).unwrap();
    assert_eq!(
        events,
        vec![GameEvent::MonopolyClaimed {
            player: 0,
            resource: Resource::Ore,
            total_taken: 5,
        }]
    );
    assert_eq!(game.players[0].resources, ResourceHand::with_amounts(1, 1, 6, 1, 1));
    assert_eq!(game.players[1].resources, ResourceHand::with_amounts(0, 2, 0, 0, 0));
    assert_eq!(game.players[2].resources, ResourceHand::with_amounts(0, 0, 0, 1, 0));
    assert!(game.players[0].dev_cards.is_empty());

    // Played before the roll, so the turn goes back to rolling
    assert_eq!(game.phase(), &Phase::Roll);
}

#[test]
fn test_year_of_plenty_and_road_building() {
    let mut game = scripted_game(3, LoadedDice::always(2, 3), Vec::new());
    complete_setup(&mut game);
    roll_and_settle(&mut game);
    game.players[0].resources = ResourceHand::new();

    for card in [DevCard::YearOfPlenty, DevCard::RoadBuilding] {
        game.players[0].dev_cards.push(HeldCard {
            card,
            drawn_on_turn: 0,
        });
    }

    game.apply(0, Decision::PlayDevCard(0)).unwrap();
    assert_eq!(game.phase(), &Phase::YearOfPlenty);
    game.apply(0, Decision::ClaimYearOfPlenty(Resource::Ore, Resource::Ore))
        .unwrap();
    assert_eq!(game.players[0].resources, ResourceHand::single(Resource::Ore, 2));
    assert_eq!(game.phase(), &Phase::Actions);

    game.apply(0, Decision::PlayDevCard(0)).unwrap();
    assert_eq!(
        game.pending_request(),
        Some(DecisionRequest::FreeRoad {
            player: 0,
            remaining: 2,
        })
    );
    let edge = game.board.legal_road_spots(0)[0];
    let events = game.apply(0, Decision::BuildRoad(edge)).unwrap();
    assert_eq!(
        events,
        vec![GameEvent::RoadPlaced {
            player: 0,
            location: edge,
            free: true,
        }]
    );
    assert_eq!(game.phase(), &Phase::RoadBuilding { remaining: 1 });

    game.apply(0, Decision::FinishRoadBuilding).unwrap();
    assert_eq!(game.phase(), &Phase::Actions);
    assert_eq!(game.board.road_count(0), 3);
    assert_eq!(game.players[0].resources, ResourceHand::single(Resource::Ore, 2));
}

#[test]
fn test_road_building_ends_after_two_free_roads() {
    let mut game = scripted_game(3, LoadedDice::always(2, 3), Vec::new());
    complete_setup(&mut game);
    roll_and_settle(&mut game);
    game.players[0].resources = ResourceHand::new();
    game.players[0].dev_cards.push(HeldCard {
        card: DevCard::RoadBuilding,
        drawn_on_turn: 0,
    });

    game.apply(0, Decision::PlayDevCard(0)).unwrap();
    let first = game.board.legal_road_spots(0)[0];
    game.apply(0, Decision::BuildRoad(first)).unwrap();
    assert_eq!(game.phase(), &Phase::RoadBuilding { remaining: 1 });

    let second = game.board.legal_road_spots(0)[0];
    let events = game.apply(0, Decision::BuildRoad(second)).unwrap();
    assert_eq!(
        events,
        vec![GameEvent::RoadPlaced {
            player: 0,
            location: second,
            free: true,
        }]
    );
    assert_eq!(game.phase(), &Phase::Actions);
    assert_eq!(game.board.road_count(0), 4);
    assert_eq!(game.players[0].roads.len(), 4);
    assert!(game.players[0].resources.is_empty());

    // Back in the action loop, further roads cost resources again
    let third = game.board.legal_road_spots(0)[0];
    assert_eq!(
        game.apply(0, Decision::BuildRoad(third)),
        Err(GameError::InsufficientResources)
    );
}

#[test]
fn test_free_roads_respect_the_road_cap() {
    let config = GameConfig {
        max_roads: 2,
        ..GameConfig::default()
    };
    let mut game = Game::with_parts(
        config,
        names(3),
        Board::fixed(),
        Deck::from_cards(Vec::new()),
        LoadedDice::always(2, 3),
    )
    .unwrap();
    complete_setup(&mut game);
    roll_and_settle(&mut game);
    assert_eq!(game.board.road_count(0), 2);

    game.players[0].dev_cards.push(HeldCard {
        card: DevCard::RoadBuilding,
        drawn_on_turn: 0,
    });
    game.apply(0, Decision::PlayDevCard(0)).unwrap();
    assert_eq!(game.phase(), &Phase::RoadBuilding { remaining: 2 });

    let edge = game.board.legal_road_spots(0)[0];
    let board_before = game.board.clone();
    assert_eq!(
        game.apply(0, Decision::BuildRoad(edge)),
        Err(GameError::CapacityExceeded(Piece::Road))
    );
    assert_eq!(game.board, board_before);
    assert_eq!(game.phase(), &Phase::RoadBuilding { remaining: 2 });
    assert_eq!(game.valid_decisions(0), vec![Decision::FinishRoadBuilding]);

    game.apply(0, Decision::FinishRoadBuilding).unwrap();
    assert_eq!(game.phase(), &Phase::Actions);
}

#[test]
fn test_largest_army_goes_to_first_and_moves_on_strictly_more() {
    let mut game = scripted_game(3, LoadedDice::always(2, 3), Vec::new());
    complete_setup(&mut game);

    for _ in 0..3 {
        game.players[0].dev_cards.push(HeldCard {
            card: DevCard::Knight,
            drawn_on_turn: 0,
        });
    }

    for played in 1..=3 {
        let events = game.apply(0, Decision::PlayDevCard(0)).unwrap();
        move_robber_anywhere(&mut game, 0);
        if played < 3 {
            assert_eq!(game.largest_army_holder(), None);
        } else {
            assert!(events.contains(&GameEvent::LargestArmyChanged {
                previous: None,
                current: 0,
                knights: 3,
            }));
        }
    }
    assert_eq!(game.largest_army_holder(), Some(0));
    assert_eq!(game.players[0].victory_points, 4);
    assert_eq!(game.phase(), &Phase::Roll);

    let events = pass_turn(&mut game);
    assert!(events.contains(&GameEvent::TurnEnded {
        player: 0,
        next_player: 1,
    }));

    for _ in 0..4 {
        game.players[1].dev_cards.push(HeldCard {
            card: DevCard::Knight,
            drawn_on_turn: 0,
        });
    }
    for _ in 0..3 {
        game.apply(1, Decision::PlayDevCard(0)).unwrap();
        move_robber_anywhere(&mut game, 1);
    }
    // Equal counts leave it with the holder
    assert_eq!(game.largest_army_holder(), Some(0));

    game.apply(1, Decision::PlayDevCard(0)).unwrap();
    move_robber_anywhere(&mut game, 1);
    assert_eq!(game.largest_army_holder(), Some(1));
    assert!(!game.players[0].has_largest_army);
    assert_eq!(game.players[0].victory_points, 2);
    assert_eq!(game.players[1].victory_points, 4);
}

// ==================== Trading ====================

#[test]
fn test_bank_trade_uses_port_ratio() {
    let mut game = scripted_game(3, LoadedDice::always(2, 3), Vec::new());
    complete_setup(&mut game);
    roll_and_settle(&mut game);

    let ratio = game.players[0].ports.ratio_for(Resource::Wool);
    game.players[0].resources = ResourceHand::single(Resource::Wool, 4);

    assert_eq!(
        game.apply(
            0,
            Decision::BankTrade {
                give: Resource::Wool,
                receive: Resource::Wool,
            }
        ),
        Err(GameError::InvalidTrade)
    );

    game.apply(
        0,
        Decision::BankTrade {
            give: Resource::Wool,
            receive: Resource::Ore,
        },
    )
    .unwrap();
    assert_eq!(game.players[0].resources.get(Resource::Wool), 4 - ratio);
    assert_eq!(game.players[0].resources.get(Resource::Ore), 1);

    game.players[0].resources = ResourceHand::single(Resource::Wool, 1);
    assert_eq!(
        game.apply(
            0,
            Decision::BankTrade {
                give: Resource::Wool,
                receive: Resource::Ore,
            }
        ),
        Err(GameError::InsufficientResources)
    );
}

#[test]
fn test_player_trade_accept_and_reject() {
    let mut game = scripted_game(3, LoadedDice::always(2, 3), Vec::new());
    complete_setup(&mut game);
    roll_and_settle(&mut game);

    game.players[0].resources = ResourceHand::single(Resource::Brick, 2);
    game.players[1].resources = ResourceHand::single(Resource::Ore, 1);
    game.players[2].resources = ResourceHand::new();

    let to_self = TradeOffer::new(
        0,
        0,
        ResourceHand::single(Resource::Brick, 1),
        ResourceHand::single(Resource::Ore, 1),
    );
    assert_eq!(game.apply(0, Decision::ProposeTrade(to_self)), Err(GameError::InvalidTrade));

    let too_generous = TradeOffer::new(
        0,
        1,
        ResourceHand::single(Resource::Brick, 3),
        ResourceHand::single(Resource::Ore, 1),
    );
    assert_eq!(
        game.apply(0, Decision::ProposeTrade(too_generous)),
        Err(GameError::InsufficientResources)
    );

    let offer = TradeOffer::new(
        0,
        1,
        ResourceHand::single(Resource::Brick, 2),
        ResourceHand::single(Resource::Ore, 1),
    );
    game.apply(0, Decision::ProposeTrade(offer.clone())).unwrap();
    assert_eq!(
        game.pending_request(),
        Some(DecisionRequest::TradeResponse {
            player: 1,
            offer: offer.clone(),
        })
    );
    assert_eq!(game.apply(0, Decision::EndTurn), Err(GameError::InvalidPhase));
    assert_eq!(
        game.apply(2, Decision::RespondToTrade { accept: true }),
        Err(GameError::NotYourTurn)
    );

    let events = game.apply(1, Decision::RespondToTrade { accept: true }).unwrap();
    assert_eq!(events, vec![GameEvent::TradeCompleted { offer }]);
    assert_eq!(game.players[0].resources, ResourceHand::single(Resource::Ore, 1));
    assert_eq!(game.players[1].resources, ResourceHand::single(Resource::Brick, 2));
    assert_eq!(game.phase(), &Phase::Actions);

    let counter = TradeOffer::new(
        0,
        1,
        ResourceHand::single(Resource::Ore, 1),
        ResourceHand::single(Resource::Brick, 1),
    );
    game.apply(0, Decision::ProposeTrade(counter.clone())).unwrap();
    let events = game.apply(1, Decision::RespondToTrade { accept: false }).unwrap();
    assert_eq!(events, vec![GameEvent::TradeRejected { offer: counter }]);
    assert_eq!(game.players[0].resources, ResourceHand::single(Resource::Ore, 1));
    assert_eq!(game.phase(), &Phase::Actions);
}

// ==================== Victory ====================

#[test]
fn test_victory_waits_for_round_end_and_ignores_ties() {
    let mut game = scripted_game(3, LoadedDice::always(2, 3), Vec::new());
    complete_setup(&mut game);

    give_victory_cards(&mut game, 0, 8);
    give_victory_cards(&mut game, 1, 8);
    for _ in 0..3 {
        pass_turn(&mut game);
    }
    // 10 apiece is a tie
    assert!(!game.is_finished());
    assert_eq!(game.current_player(), 0);

    give_victory_cards(&mut game, 0, 1);
    pass_turn(&mut game);
    assert!(!game.is_finished(), "victory is only checked at round end");
    pass_turn(&mut game);
    let events = pass_turn(&mut game);

    assert!(events.contains(&GameEvent::GameWon {
        player: 0,
        victory_points: 11,
    }));
    assert_eq!(game.winner(), Some(0));
    assert_eq!(game.pending_request(), None);
    assert!(game.valid_decisions(0).is_empty());
    assert_eq!(game.apply(0, Decision::RollDice), Err(GameError::GameOver));
}

// ==================== Whole games ====================

#[test]
fn test_seeded_random_games_keep_invariants() {
    for seed in 0..4u64 {
        let config = GameConfig {
            seed: Some(seed),
            ..GameConfig::default()
        };
        let mut game = Game::new(config.clone(), names(3 + (seed as usize % 2))).unwrap();
        let mut rng = StdRng::seed_from_u64(seed);

        for _ in 0..3000 {
            let Some(request) = game.pending_request() else {
                break;
            };
            let player = request.player();
            let decisions = game.valid_decisions(player);
            assert!(!decisions.is_empty(), "seed {seed}: nothing to do for {request:?}");

            let decision = decisions.choose(&mut rng).unwrap().clone();
            game.apply(player, decision).unwrap();

            for p in &game.players {
                assert_eq!(p.victory_points, game.audited_victory_points(p.id));
                assert!(game.board.road_count(p.id) <= config.max_roads);
                assert!(game.board.structure_count(p.id, StructureKind::Settlement) <= config.max_settlements);
                assert!(game.board.structure_count(p.id, StructureKind::City) <= config.max_cities);
            }
            assert_eq!(game.board.tiles().filter(|t| t.has_robber).count(), 1);
        }

        assert!(game.turn() > 1, "seed {seed}: game never left setup");
    }
}
